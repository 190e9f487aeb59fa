//! API error taxonomy and its mapping onto HTTP responses.
//!
//! Bodies are always `{"message": ...}` JSON. Upstream and internal failures
//! are logged with their source and answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::handlers::auth::session::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Duplicate username or email. The wire contract answers 400, not 409.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Authenticated but not an administrator.
    #[error("Admins only")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Object storage or email dispatch failed.
    #[error("Upstream service failed")]
    Upstream(#[source] anyhow::Error),

    /// Unexpected store failure.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::UserNotFound) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Upstream(source) => error!("Upstream failure: {source:#}"),
            ApiError::Internal(source) => error!("Internal failure: {source:#}"),
            _ => {}
        }

        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth(AuthError::Missing).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::Invalid).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Auth(AuthError::UserNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("User").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Upstream(anyhow!("boom")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::Internal(anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn invalid_and_expired_tokens_answer_identically() {
        let invalid = ApiError::Auth(AuthError::Invalid);
        let expired = ApiError::Auth(AuthError::Expired);
        assert_eq!(invalid.status(), expired.status());
        assert_eq!(invalid.to_string(), expired.to_string());
    }

    #[test]
    fn messages_hide_internal_detail() {
        assert_eq!(
            ApiError::Upstream(anyhow!("smtp: connection refused")).to_string(),
            "Upstream service failed"
        );
        assert_eq!(
            ApiError::Internal(anyhow!("db went away")).to_string(),
            "Internal server error"
        );
        assert_eq!(ApiError::NotFound("User").to_string(), "User not found");
    }
}
