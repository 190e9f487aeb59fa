//! Payment-proof review endpoints.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{
    error::ApiError,
    handlers::auth::principal::require_auth,
    handlers::payment::storage::{list_all_proofs, update_proof_status, ProofStatus},
    state::AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub status: Option<String>,
}

/// List every submitted proof with its owner, newest first.
#[utoipa::path(
    get,
    path = "/api/admin/transfer-proofs",
    responses(
        (status = 200, description = "All proofs with owner identities"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn transfer_proofs(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, state.jwt_secret(), &pool).await?;
    principal.require_admin()?;

    let proofs = list_all_proofs(&pool).await?;
    Ok(Json(proofs))
}

/// Record a review decision on one proof.
#[utoipa::path(
    patch,
    path = "/api/admin/transfer-proofs/{id}",
    params(("id" = Uuid, Path, description = "Proof under review")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 400, description = "Status is not pending, approved or rejected"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such proof")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn review_proof(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(proof_id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, state.jwt_secret(), &pool).await?;
    principal.require_admin()?;

    let status: ProofStatus = payload
        .and_then(|Json(body)| body.status)
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|()| ApiError::Validation("Invalid status".to_string()))?;

    let Some(record) = update_proof_status(&pool, proof_id, status).await? else {
        return Err(ApiError::NotFound("Proof"));
    };

    info!(%proof_id, %status, by = %principal.user_id, "proof reviewed");

    Ok(Json(record))
}
