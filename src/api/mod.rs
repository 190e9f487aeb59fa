//! HTTP surface: router, middleware stack and server loop.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, options, patch, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
pub mod state;

use handlers::{admin, auth, health, payment};
use state::AppState;

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Build the application router around shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers(Any)
        // allow requests from any origin
        .allow_origin(Any);

    Router::new()
        .route("/sign-up", post(auth::signup::signup))
        .route("/login", post(auth::login::login))
        .route("/verify", get(auth::verify::verify_email))
        .route("/request-reset-password", post(auth::reset::request_reset))
        .route("/reset-password", post(auth::reset::reset_password))
        .route("/api/admin/users", get(admin::users::users))
        .route(
            "/api/admin/users/:id/toggle-admin",
            patch(admin::users::toggle_admin),
        )
        .route(
            "/api/admin/transfer-proofs",
            get(admin::proofs::transfer_proofs),
        )
        .route(
            "/api/admin/transfer-proofs/:id",
            patch(admin::proofs::review_proof),
        )
        .route("/api/confirm-payment", post(payment::confirm::confirm_payment))
        .route("/api/my-orders", get(payment::orders::my_orders))
        .route("/health", get(health::health))
        .route("/health", options(health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .layer(Extension(state)),
        )
}

/// Connect to the database and serve until interrupted.
///
/// # Errors
/// Returns an error if the database is unreachable or the listener fails.
pub async fn new(port: u16, dsn: String, state: AppState) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let app = router(Arc::new(state)).layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, ?headers, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::test_support::{lazy_pool, test_state};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn unknown_route_is_404() -> Result<()> {
        let app = router(test_state()).layer(Extension(lazy_pool()?));
        let response = app
            .oneshot(Request::builder().uri("/nope").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn sign_up_rejects_empty_body() -> Result<()> {
        let app = router(test_state()).layer(Extension(lazy_pool()?));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sign-up")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn my_orders_rejects_missing_token() -> Result<()> {
        let app = router(test_state()).layer(Extension(lazy_pool()?));
        let response = app
            .oneshot(Request::builder().uri("/api/my-orders").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn admin_users_rejects_missing_token() -> Result<()> {
        let app = router(test_state()).layer(Extension(lazy_pool()?));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/users")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
