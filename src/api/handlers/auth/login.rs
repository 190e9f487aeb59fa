//! Login: password check and session token issuance.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::session;
use super::storage::lookup_login_record;
use super::types::{LoginRequest, LoginResponse};
use super::utils::verify_password;
use crate::api::{error::ApiError, state::AppState};

/// Authenticate by email and password.
///
/// The three rejection reasons are distinct and checked in a fixed order:
/// unknown email (400), wrong password (401), unverified account (401).
/// Success answers 201 with a 3-day bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 201, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "User does not exist"),
        (status = 401, description = "Invalid password or unverified email")
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::Validation("Missing payload".to_string()));
    };

    let email = request.email.trim();
    let Some(record) = lookup_login_record(&pool, email).await? else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "User does not exist" })),
        )
            .into_response());
    };

    if !verify_password(&request.password, &record.password_hash) {
        debug!(%record.user_id, "login rejected: password mismatch");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid password" })),
        )
            .into_response());
    }

    if !record.is_verified {
        debug!(%record.user_id, "login rejected: email not verified");
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Please verify your email first" })),
        )
            .into_response());
    }

    let token = session::issue(
        state.jwt_secret(),
        record.user_id,
        email,
        &record.username,
        state.config().session_ttl_seconds(),
    )?;

    let response = LoginResponse {
        message: "success".to_string(),
        token,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{lazy_pool, test_state};
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let response = login(Extension(lazy_pool()?), Extension(test_state()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
