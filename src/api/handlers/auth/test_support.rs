//! Shared fixtures for handler tests.
//!
//! The lazy pool never connects: handlers under test bail out on
//! validation or auth before touching the database.

use anyhow::Result;
use secrecy::SecretString;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

use crate::api::state::{AppConfig, AppState};
use crate::bucket::Bucket;
use crate::mailer::Mailer;

pub(crate) fn test_state() -> Arc<AppState> {
    let mailer = Mailer::new(
        "smtp.invalid",
        587,
        "mailer".to_string(),
        SecretString::from("hunter2".to_string()),
        "Kantin <no-reply@kantin.school>".to_string(),
    )
    .expect("test mailer");
    let bucket = Bucket::new(
        "https://storage.invalid",
        SecretString::from("service-key".to_string()),
        "transfer-proofs".to_string(),
    )
    .expect("test bucket");
    Arc::new(AppState::new(
        AppConfig::new("http://localhost:3002".to_string()),
        SecretString::from("a-test-secret-at-least-32-bytes!".to_string()),
        mailer,
        bucket,
    ))
}

pub(crate) fn lazy_pool() -> Result<PgPool> {
    Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
}
