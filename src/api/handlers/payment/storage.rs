//! Database helpers for payment-proof records.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};
use std::fmt;
use std::str::FromStr;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// Review state of a submitted proof.
///
/// Review decisions are not one-way: a proof can move between any two
/// states, including back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(()),
        }
    }
}

/// A stored proof row, as returned to its owner.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProofRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub filepath: String,
    pub status: String,
    pub cart_json: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A proof row joined with its owner's identity, for review listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub filename: String,
    pub filepath: String,
    pub status: String,
    pub cart_json: String,
    pub uploaded_at: DateTime<Utc>,
}

fn proof_from_row(row: &sqlx::postgres::PgRow) -> ProofRecord {
    ProofRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        filename: row.get("filename"),
        filepath: row.get("filepath"),
        status: row.get("status"),
        cart_json: row.get("cart_json"),
        uploaded_at: row.get("uploaded_at"),
    }
}

/// Record a proof whose object already landed in the bucket.
pub async fn insert_proof(
    pool: &PgPool,
    user_id: Uuid,
    filename: &str,
    filepath: &str,
    cart_json: &str,
) -> Result<ProofRecord> {
    let query = r"
        INSERT INTO payment_proofs (user_id, filename, filepath, cart_json)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, filename, filepath, status, cart_json, uploaded_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(filename)
        .bind(filepath)
        .bind(cart_json)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert payment proof")?;

    Ok(proof_from_row(&row))
}

/// All proofs submitted by one user, newest first.
pub async fn list_proofs_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProofRecord>> {
    let query = r"
        SELECT id, user_id, filename, filepath, status, cart_json, uploaded_at
        FROM payment_proofs
        WHERE user_id = $1
        ORDER BY uploaded_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list payment proofs")?;

    Ok(rows.iter().map(proof_from_row).collect())
}

/// Every proof in the store with its owner attached, newest first.
pub async fn list_all_proofs(pool: &PgPool) -> Result<Vec<ReviewRecord>> {
    let query = r"
        SELECT p.id, p.user_id, u.username, u.email,
               p.filename, p.filepath, p.status, p.cart_json, p.uploaded_at
        FROM payment_proofs p
        JOIN users u ON u.id = p.user_id
        ORDER BY p.uploaded_at DESC
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
        .context("failed to list payment proofs for review")?;

    Ok(rows
        .iter()
        .map(|row| ReviewRecord {
            id: row.get("id"),
            user_id: row.get("user_id"),
            username: row.get("username"),
            email: row.get("email"),
            filename: row.get("filename"),
            filepath: row.get("filepath"),
            status: row.get("status"),
            cart_json: row.get("cart_json"),
            uploaded_at: row.get("uploaded_at"),
        })
        .collect())
}

/// Set a proof's review status. Returns the updated row, or `None` when no
/// proof with that id exists.
pub async fn update_proof_status(
    pool: &PgPool,
    proof_id: Uuid,
    status: ProofStatus,
) -> Result<Option<ProofRecord>> {
    let query = r"
        UPDATE payment_proofs
        SET status = $2
        WHERE id = $1
        RETURNING id, user_id, filename, filepath, status, cart_json, uploaded_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(proof_id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to update proof status")?;

    Ok(row.as_ref().map(proof_from_row))
}
