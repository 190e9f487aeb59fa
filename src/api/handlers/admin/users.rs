//! Administrative user listing and role management.

use anyhow::{Context, Result};
use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{info, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{error::ApiError, handlers::auth::principal::require_auth, state::AppState};

/// One account as shown in the admin listing. Password hashes and
/// verification tokens never leave the store.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>> {
    let query = r"
        SELECT id, username, email, is_verified, is_admin, created_at
        FROM users
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows
        .iter()
        .map(|row| UserSummary {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            is_verified: row.get("is_verified"),
            is_admin: row.get("is_admin"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Flip the flag in place so two concurrent toggles serialize in the
/// store rather than racing on a read value.
pub async fn toggle_admin_flag(pool: &PgPool, user_id: Uuid) -> Result<Option<(String, bool)>> {
    let query = r"
        UPDATE users
        SET is_admin = NOT is_admin
        WHERE id = $1
        RETURNING username, is_admin
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to toggle admin flag")?;

    Ok(row.map(|row| (row.get("username"), row.get("is_admin"))))
}

/// List every account.
#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn users(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, state.jwt_secret(), &pool).await?;
    principal.require_admin()?;

    let users = list_users(&pool).await?;
    Ok(Json(users))
}

/// Grant or revoke the admin role on an account.
///
/// An admin can toggle any account, including their own; revoking
/// yourself takes effect on the next request.
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/toggle-admin",
    params(("id" = Uuid, Path, description = "Account to toggle")),
    responses(
        (status = 200, description = "Role flipped"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such account")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn toggle_admin(
    pool: Extension<PgPool>,
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = require_auth(&headers, state.jwt_secret(), &pool).await?;
    principal.require_admin()?;

    let Some((username, is_admin)) = toggle_admin_flag(&pool, user_id).await? else {
        return Err(ApiError::NotFound("User"));
    };

    info!(%user_id, is_admin, by = %principal.user_id, "admin role toggled");

    Ok(Json(json!({
        "id": user_id,
        "username": username,
        "is_admin": is_admin,
    })))
}
