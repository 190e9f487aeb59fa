//! # kantin
//!
//! Backend for the school store: user accounts with email verification,
//! JWT bearer sessions, password reset, and administrator review of
//! user-submitted bank-transfer proofs.
//!
//! The binary is a single axum service backed by `PostgreSQL`. Uploaded
//! proof files go to an external HTTP object store; verification and
//! reset mail goes out over SMTP.
//!
//! ## Single-use tokens
//!
//! Each user carries at most one live out-of-band token (`verify_code`),
//! used both for email verification and password reset. Issuing a new
//! token overwrites the previous one; consuming it applies its side
//! effect (verify flip or password rewrite) and clears the column in a
//! single conditional `UPDATE`, so a token can never be replayed even
//! under concurrent requests.
//!
//! ## Roles
//!
//! `is_admin` is re-read from the database on every authorized request;
//! a session token minted before an admin was demoted carries no weight.

pub mod api;
pub mod bucket;
pub mod cli;
pub mod mailer;

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
