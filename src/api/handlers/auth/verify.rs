//! Email verification via the link sent at sign-up.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Redirect},
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::storage::consume_verification_token;
use super::types::VerifyQuery;
use crate::api::{error::ApiError, state::AppState};

/// Consume the verification token and activate the account.
///
/// The flip to verified and the clearing of the token happen in one
/// conditional update; a replayed or concurrent request sees the generic
/// invalid/expired failure. Success redirects to the storefront login.
#[utoipa::path(
    get,
    path = "/verify",
    params(("token" = Option<String>, Query, description = "Single-use verification token")),
    responses(
        (status = 303, description = "Verified, redirecting to login"),
        (status = 400, description = "Missing, invalid or expired token")
    ),
    tag = "auth"
)]
pub async fn verify_email(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let token = query.token.as_deref().map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Err(ApiError::Validation("Missing token".to_string()));
    }

    if !consume_verification_token(&pool, token).await? {
        // Already consumed, replaced, or never issued: one generic answer.
        return Err(ApiError::Validation("Invalid or expired token".to_string()));
    }

    info!("email verified");
    let target = format!("{}/login?verified=1", state.config().public_url());
    Ok(Redirect::to(&target))
}
