//! Route handlers, grouped by concern.

pub mod admin;
pub mod auth;
pub mod health;
pub mod payment;
