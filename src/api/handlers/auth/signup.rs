//! Account creation with out-of-band email verification.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::storage::{insert_unverified_user, IdentityConflict, SignupOutcome};
use super::types::SignupRequest;
use super::utils::{generate_single_use_token, hash_password, valid_email};
use crate::api::{error::ApiError, state::AppState};

/// Create an unverified account and send the verification link.
///
/// The user row, its verification token, and the email dispatch commit or
/// fail together: if the relay rejects the message the transaction rolls
/// back, so no account is ever stranded without a deliverable link.
/// Signing up does not log the user in.
#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification email sent"),
        (status = 400, description = "Missing fields or duplicate username/email"),
        (status = 502, description = "Verification email could not be dispatched")
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(ApiError::Validation(
            "Username, email and password are required".to_string(),
        ));
    }
    if !valid_email(email) {
        return Err(ApiError::Validation("Invalid email address".to_string()));
    }
    if request.password.len() < state.config().min_password_len() {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            state.config().min_password_len()
        )));
    }

    let password_hash = hash_password(&request.password)?;
    let token = generate_single_use_token()?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|err| ApiError::Internal(err.into()))?;

    // Early returns drop `tx`, which rolls the transaction back.
    match insert_unverified_user(&mut tx, username, email, &password_hash, &token).await? {
        SignupOutcome::Conflict(IdentityConflict::Username) => {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
        SignupOutcome::Conflict(IdentityConflict::Email) => {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        SignupOutcome::Created(user_id) => {
            let verify_url = format!("{}/verify?token={token}", state.config().public_url());
            if let Err(err) = state.mailer().send_verification(email, &verify_url).await {
                return Err(ApiError::Upstream(err));
            }

            tx.commit()
                .await
                .map_err(|err| ApiError::Internal(err.into()))?;

            info!(%user_id, "user registered, verification pending");
        }
    }

    Ok((StatusCode::CREATED, Json(json!({ "success": true }))))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{lazy_pool, test_state};
    use super::*;
    use anyhow::Result;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn signup_missing_payload() -> Result<()> {
        let response = signup(Extension(lazy_pool()?), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_state()),
            Some(Json(SignupRequest {
                username: " ".to_string(),
                email: "a@x.com".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_rejects_bad_email() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_state()),
            Some(Json(SignupRequest {
                username: "alice".to_string(),
                email: "not-an-email".to_string(),
                password: "secret1".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn signup_rejects_short_password() -> Result<()> {
        let response = signup(
            Extension(lazy_pool()?),
            Extension(test_state()),
            Some(Json(SignupRequest {
                username: "alice".to_string(),
                email: "a@x.com".to_string(),
                password: "short".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
