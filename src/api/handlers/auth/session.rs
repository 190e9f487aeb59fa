//! Bearer session tokens: HS256 JWTs carrying the user's identity.
//!
//! Tokens are valid for a fixed window from issuance (3 days by default via
//! [`crate::api::state::AppConfig`]). The admin flag is deliberately NOT part of
//! the claims; it is re-read from the database on every authorized request.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Why a request failed to authenticate.
///
/// `Invalid` and `Expired` are distinguished here for logging, but collapse
/// into one generic message at the HTTP boundary so callers cannot probe
/// which of the two it was.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("No token provided")]
    Missing,
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Invalid or expired token")]
    Expired,
    #[error("User not found")]
    UserNotFound,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Mint a session token for a freshly authenticated user.
///
/// # Errors
///
/// Returns an error if JWT encoding fails.
pub fn issue(
    secret: &SecretString,
    user_id: Uuid,
    email: &str,
    username: &str,
    ttl_seconds: i64,
) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        username: username.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )?;
    Ok(token)
}

/// Verify a session token and return its claims.
///
/// # Errors
///
/// `AuthError::Expired` for tokens past their window, `AuthError::Invalid`
/// for anything else (bad signature, malformed, wrong algorithm).
pub fn verify(secret: &SecretString, token: &str) -> Result<Claims, AuthError> {
    // Zero leeway: tokens are rejected strictly after their expiry.
    let mut validation = Validation::default();
    validation.leeway = 0;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    ) {
        Ok(data) => Ok(data.claims),
        Err(err) => match err.kind() {
            ErrorKind::ExpiredSignature => Err(AuthError::Expired),
            _ => Err(AuthError::Invalid),
        },
    }
}

/// Pull the bearer token out of the `Authorization` header, if any.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
