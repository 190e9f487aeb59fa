//! Order history for the authenticated user.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;

use super::storage::list_proofs_for_user;
use crate::api::{error::ApiError, handlers::auth::principal::require_auth, state::AppState};

/// List the caller's own payment proofs, newest first.
#[utoipa::path(
    get,
    path = "/api/my-orders",
    responses(
        (status = 200, description = "The caller's proofs"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer" = [])),
    tag = "payment"
)]
pub async fn my_orders(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, state.jwt_secret(), &pool).await?;
    let proofs = list_proofs_for_user(&pool, principal.user_id).await?;
    Ok(Json(proofs))
}
