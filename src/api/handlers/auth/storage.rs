//! Database helpers for identity and single-use token state.
//!
//! Every invariant that matters under concurrency lives here as a single
//! conditional statement: token consumption pairs the side effect (verify
//! flip, password rewrite) with clearing `verify_code` in one `UPDATE`, so
//! two requests racing on the same token can never both succeed.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// Which identity field collided during sign-up.
///
/// When both collide, username wins: it is checked (and reported) first.
#[derive(Debug, PartialEq, Eq)]
pub enum IdentityConflict {
    Username,
    Email,
}

/// Outcome when attempting to create a new unverified user.
#[derive(Debug)]
pub enum SignupOutcome {
    Created(Uuid),
    Conflict(IdentityConflict),
}

/// Fields needed to evaluate a login attempt.
pub struct LoginRecord {
    pub user_id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub is_verified: bool,
}

/// Current identity row backing an authorized request.
pub struct PrincipalRecord {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

/// Look up login data by email.
pub async fn lookup_login_record(
    pool: &PgPool,
    email: &str,
) -> Result<Option<LoginRecord>> {
    let query = r"
        SELECT id, username, password_hash, is_verified
        FROM users
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup login record")?;

    Ok(row.map(|row| LoginRecord {
        user_id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        is_verified: row.get("is_verified"),
    }))
}

/// Re-read the identity row referenced by a verified session token.
///
/// Returns `None` when the account no longer exists. The `is_admin` flag
/// always reflects current store state, never the token's snapshot.
pub async fn lookup_principal(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<PrincipalRecord>> {
    let query = "SELECT id, email, is_admin FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup principal")?;

    Ok(row.map(|row| PrincipalRecord {
        user_id: row.get("id"),
        email: row.get("email"),
        is_admin: row.get("is_admin"),
    }))
}

/// Create an unverified user carrying its verification token.
///
/// The pre-check fixes the reporting order (username first); the unique
/// constraints still catch insert races. A failed INSERT aborts the
/// transaction, so the raced conflict is attributed from the violated
/// constraint name rather than a follow-up query.
pub async fn insert_unverified_user(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    username: &str,
    email: &str,
    password_hash: &str,
    verify_code: &str,
) -> Result<SignupOutcome> {
    let query = "SELECT username, email FROM users WHERE username = $1 OR email = $2 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let existing = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(&mut **tx)
        .instrument(span)
        .await
        .context("failed to check for existing user")?;

    if let Some(row) = existing {
        let existing_username: String = row.get("username");
        let conflict = if existing_username == username {
            IdentityConflict::Username
        } else {
            IdentityConflict::Email
        };
        return Ok(SignupOutcome::Conflict(conflict));
    }

    let query = r"
        INSERT INTO users (username, email, password_hash, verify_code)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(verify_code)
        .fetch_one(&mut **tx)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict(
            conflict_from_constraint(constraint_name(&err)),
        )),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

fn constraint_name(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// Map the violated unique constraint onto the colliding identity field.
fn conflict_from_constraint(constraint: Option<&str>) -> IdentityConflict {
    match constraint {
        Some("users_username_key") => IdentityConflict::Username,
        _ => IdentityConflict::Email,
    }
}

/// Attach a fresh reset token to the user with this email, overwriting any
/// live token. Returns the user id, or `None` for unknown emails (callers
/// must stay silent about which it was).
pub async fn issue_reset_token(
    pool: &PgPool,
    email: &str,
    token: &str,
) -> Result<Option<Uuid>> {
    let query = r"
        UPDATE users
        SET verify_code = $2
        WHERE email = $1
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to issue reset token")?;

    Ok(row.map(|row| row.get("id")))
}

/// Consume a verification token: flip `is_verified` and clear the token in
/// one statement. At most one concurrent caller can match.
pub async fn consume_verification_token(pool: &PgPool, token: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET is_verified = TRUE,
            verify_code = NULL
        WHERE verify_code = $1
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume verification token")?;

    Ok(row.is_some())
}

/// Consume a reset token: rewrite the password hash and clear the token in
/// one statement.
pub async fn consume_reset_token(
    pool: &PgPool,
    token: &str,
    new_password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            verify_code = NULL
        WHERE verify_code = $1
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to consume reset token")?;

    Ok(row.is_some())
}
