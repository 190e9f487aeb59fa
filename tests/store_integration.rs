//! Store-level integration tests against a live PostgreSQL.
//!
//! Gated on `KANTIN_TEST_DSN`; without it every test passes as a no-op so
//! the suite stays green on machines without a database. Run with:
//!
//! ```sh
//! KANTIN_TEST_DSN=postgres://postgres@localhost/kantin_test cargo test --test store_integration
//! ```

use anyhow::{Context, Result, ensure};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use kantin::api::handlers::admin::users::toggle_admin_flag;
use kantin::api::handlers::auth::storage::{
    consume_reset_token, consume_verification_token, insert_unverified_user, issue_reset_token,
    lookup_login_record, lookup_principal, IdentityConflict, SignupOutcome,
};
use kantin::api::handlers::payment::storage::{insert_proof, list_proofs_for_user};
use kantin::bucket::object_key;

const TEST_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$dGVzdHNhbHQ$c2VudGluZWw";

async fn test_pool() -> Result<Option<PgPool>> {
    let Ok(dsn) = env::var("KANTIN_TEST_DSN") else {
        return Ok(None);
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&dsn)
        .await
        .context("failed to connect to KANTIN_TEST_DSN")?;

    // Tests run concurrently; serialize the idempotent schema apply.
    let mut conn = pool.acquire().await?;
    sqlx::query("SELECT pg_advisory_lock(727272)")
        .execute(&mut *conn)
        .await?;
    let applied = sqlx::raw_sql(include_str!("../db/schema.sql"))
        .execute(&mut *conn)
        .await
        .context("failed to apply schema");
    sqlx::query("SELECT pg_advisory_unlock(727272)")
        .execute(&mut *conn)
        .await?;
    applied?;

    Ok(Some(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

fn unique_email(prefix: &str) -> String {
    format!("{}@example.test", unique(prefix))
}

async fn create_user(pool: &PgPool, username: &str, email: &str) -> Result<(Uuid, String)> {
    let token = unique("token");
    let mut tx = pool.begin().await?;
    let outcome = insert_unverified_user(&mut tx, username, email, TEST_HASH, &token).await?;
    let SignupOutcome::Created(user_id) = outcome else {
        anyhow::bail!("expected a fresh user, got {outcome:?}");
    };
    tx.commit().await?;
    Ok((user_id, token))
}

#[tokio::test]
async fn verification_token_consumes_exactly_once() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let email = unique_email("verify");
    let (user_id, token) = create_user(&pool, &unique("verify"), &email).await?;

    ensure!(consume_verification_token(&pool, &token).await?);
    ensure!(
        !consume_verification_token(&pool, &token).await?,
        "a consumed token must not consume again"
    );

    let record = lookup_login_record(&pool, &email)
        .await?
        .context("user should exist")?;
    ensure!(record.user_id == user_id);
    ensure!(record.is_verified);
    Ok(())
}

#[tokio::test]
async fn reset_token_consumes_exactly_once_and_rewrites_hash() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let email = unique_email("reset");
    create_user(&pool, &unique("reset"), &email).await?;

    ensure!(issue_reset_token(&pool, &unique_email("unknown"), "t").await?.is_none());

    let token = unique("reset-token");
    ensure!(issue_reset_token(&pool, &email, &token).await?.is_some());

    let new_hash = format!("{TEST_HASH}2");
    ensure!(consume_reset_token(&pool, &token, &new_hash).await?);
    ensure!(
        !consume_reset_token(&pool, &token, TEST_HASH).await?,
        "a consumed reset token must not consume again"
    );

    let record = lookup_login_record(&pool, &email)
        .await?
        .context("user should exist")?;
    ensure!(record.password_hash == new_hash);
    Ok(())
}

#[tokio::test]
async fn double_toggle_restores_admin_flag() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let (user_id, _) = create_user(&pool, &unique("toggler"), &unique_email("toggler")).await?;

    let (_, is_admin) = toggle_admin_flag(&pool, user_id)
        .await?
        .context("user should exist")?;
    ensure!(is_admin);

    let (_, is_admin) = toggle_admin_flag(&pool, user_id)
        .await?
        .context("user should exist")?;
    ensure!(!is_admin);

    let principal = lookup_principal(&pool, user_id)
        .await?
        .context("user should exist")?;
    ensure!(!principal.is_admin);

    ensure!(toggle_admin_flag(&pool, Uuid::new_v4()).await?.is_none());
    Ok(())
}

// Two inserts racing on the same username: the loser blocks on the unique
// index until the winner commits, then must come back as a conflict, not
// an error, even though its transaction is aborted at that point.
#[tokio::test]
async fn raced_duplicate_username_reports_conflict() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let username = unique("racer");

    let mut winner_tx = pool.begin().await?;
    let outcome = insert_unverified_user(
        &mut winner_tx,
        &username,
        &unique_email("racer"),
        TEST_HASH,
        &unique("token"),
    )
    .await?;
    ensure!(matches!(outcome, SignupOutcome::Created(_)));

    let loser_pool = pool.clone();
    let loser_username = username.clone();
    let loser = tokio::spawn(async move {
        let mut tx = loser_pool.begin().await?;
        let outcome = insert_unverified_user(
            &mut tx,
            &loser_username,
            &unique_email("racer"),
            TEST_HASH,
            &unique("token"),
        )
        .await;
        drop(tx);
        outcome
    });

    // Give the loser time to block on the uncommitted index entry.
    sleep(Duration::from_millis(200)).await;
    winner_tx.commit().await?;

    let outcome = loser.await??;
    ensure!(
        matches!(
            outcome,
            SignupOutcome::Conflict(IdentityConflict::Username)
        ),
        "raced duplicate must surface as a username conflict, got {outcome:?}"
    );
    Ok(())
}

#[tokio::test]
async fn dropped_transaction_leaves_no_user_behind() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let email = unique_email("ghost");

    let mut tx = pool.begin().await?;
    let outcome =
        insert_unverified_user(&mut tx, &unique("ghost"), &email, TEST_HASH, &unique("token"))
            .await?;
    ensure!(matches!(outcome, SignupOutcome::Created(_)));
    drop(tx);

    ensure!(
        lookup_login_record(&pool, &email).await?.is_none(),
        "an uncommitted sign-up must not persist"
    );
    Ok(())
}

#[tokio::test]
async fn proofs_store_generated_key_and_list_newest_first() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };
    let (user_id, _) = create_user(&pool, &unique("payer"), &unique_email("payer")).await?;

    let first_key = object_key("receipt.png");
    insert_proof(
        &pool,
        user_id,
        &first_key,
        &format!("https://storage.example.test/{first_key}"),
        "[]",
    )
    .await?;

    sleep(Duration::from_millis(10)).await;

    let second_key = object_key("receipt.png");
    let second = insert_proof(
        &pool,
        user_id,
        &second_key,
        &format!("https://storage.example.test/{second_key}"),
        "[]",
    )
    .await?;
    ensure!(second.filename == second_key);
    ensure!(second.status == "pending");

    let listed = list_proofs_for_user(&pool, user_id).await?;
    ensure!(listed.len() == 2);
    ensure!(listed[0].id == second.id, "newest proof must list first");
    ensure!(listed[0].filename == second_key);
    ensure!(listed[1].filename == first_key);
    Ok(())
}
