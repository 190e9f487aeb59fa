//! Password reset: request a link by email, then set the new password.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::storage::{consume_reset_token, issue_reset_token};
use super::types::{ResetPasswordRequest, ResetRequestBody};
use super::utils::{generate_single_use_token, hash_password};
use crate::api::{error::ApiError, state::AppState};

/// Request a password-reset link.
///
/// Always answers 200 once an email field is present, whether or not the
/// address is registered. For unknown addresses nothing is issued and
/// nothing is mutated. Even a failed dispatch for a known address stays a
/// 200: a 5xx here would reveal that the account exists.
#[utoipa::path(
    post,
    path = "/request-reset-password",
    request_body = ResetRequestBody,
    responses(
        (status = 200, description = "Accepted (whether or not the email is registered)"),
        (status = 400, description = "Missing email")
    ),
    tag = "auth"
)]
pub async fn request_reset(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ResetRequestBody>>,
) -> Result<impl IntoResponse, ApiError> {
    let email = payload
        .and_then(|Json(body)| body.email)
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());
    let Some(email) = email else {
        return Err(ApiError::Validation("Email is required".to_string()));
    };

    let token = generate_single_use_token()?;

    // Overwrites any live token; a previously emailed link goes dead here.
    if issue_reset_token(&pool, &email, &token).await?.is_some() {
        let reset_url = format!(
            "{}/reset-password?token={token}",
            state.config().public_url()
        );
        if let Err(err) = state.mailer().send_reset(&email, &reset_url).await {
            error!("Failed to send reset email: {err:#}");
        }
    }

    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}

/// Complete a reset: consume the token and store the new password hash.
#[utoipa::path(
    post,
    path = "/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Missing/invalid token or password too short")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Invalid request".to_string()));
    };

    let token = request.token.as_deref().map(str::trim).unwrap_or_default();
    let new_password = request.new_password.as_deref().unwrap_or_default();
    if token.is_empty() || new_password.len() < state.config().min_password_len() {
        return Err(ApiError::Validation("Invalid request".to_string()));
    }

    let password_hash = hash_password(new_password)?;

    // Consume-and-rewrite is one conditional update; a replayed token
    // matches nothing and falls through to the generic failure.
    if !consume_reset_token(&pool, token, &password_hash).await? {
        return Err(ApiError::Validation("Invalid or expired token".to_string()));
    }

    info!("password reset completed");
    Ok((StatusCode::OK, Json(json!({ "success": true }))))
}
