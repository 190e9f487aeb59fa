//! Authenticated principal resolution and the admin capability gate.
//!
//! Flow: extract the bearer token, verify its signature and expiry, then
//! re-read the user row. Admin status is taken from the store at request
//! time, never from the token payload, so revoking an admin takes effect
//! immediately even for tokens minted earlier.

use axum::http::HeaderMap;
use secrecy::SecretString;
use sqlx::PgPool;

use super::session::{extract_bearer_token, verify, AuthError};
use super::storage::lookup_principal;
use crate::api::error::ApiError;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl Principal {
    /// Capability gate for administrator-only operations.
    ///
    /// # Errors
    ///
    /// `ApiError::Forbidden` when the caller is not an administrator.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Resolve a bearer token into a principal.
///
/// # Errors
///
/// `AuthError::Missing` without a token, the generic invalid/expired error
/// for bad tokens, and `AuthError::UserNotFound` when the token is validly
/// signed but the account no longer exists.
pub async fn require_auth(
    headers: &HeaderMap,
    secret: &SecretString,
    pool: &PgPool,
) -> Result<Principal, ApiError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::Missing)?;
    let claims = verify(secret, &token)?;

    let record = lookup_principal(pool, claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Principal {
        user_id: record.user_id,
        email: record.email,
        is_admin: record.is_admin,
    })
}
