//! # campus-api: Campus Resource Moderation Service
//!
//! Publishers create learning resources as drafts and submit them for
//! review; admins approve or reject them; every decision is kept in an
//! append-only review ledger.
//!
//! ## API Surface
//!
//! | Prefix                | Module                 | Auth   |
//! |-----------------------|------------------------|--------|
//! | `/api/resources/*`    | [`routes::resources`]  | Bearer |
//! | `/health/*`           | probes                 | none   |
//! | `/metrics`            | [`middleware::metrics`]| none   |
//! | `/openapi.json`       | [`openapi`]            | none   |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## Layers
//!
//! - [`auth`]: the authorization gate: credential resolution, role poset,
//!   capability table.
//! - [`workflow`]: the resource lifecycle manager.
//! - [`ledger`]: the review ledger.
//! - [`persistence`] / [`db`]: in-memory and PostgreSQL stores.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod ledger;
pub mod middleware;
pub mod openapi;
pub mod persistence;
pub mod routes;
pub mod state;
pub mod workflow;

use axum::extract::State;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::{metrics_handler, ApiMetrics};

pub use error::AppError;
pub use state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes, metrics, and the OpenAPI document are mounted outside the
/// auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        provider: state.tokens.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::resources::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .layer(Extension(metrics.clone()))
        .with_state(state.clone());

    // Unauthenticated probes and documents.
    let public = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_handler))
        .merge(openapi::router())
        .layer(Extension(metrics))
        .with_state(state);

    Router::new().merge(public).merge(api)
}

/// Liveness probe. Always 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. 503 when the persistence backend does not answer.
async fn readiness(State(state): State<AppState>) -> Result<&'static str, AppError> {
    state.lifecycle.store().ping().await.map_err(|e| {
        tracing::warn!(error = %e, "readiness check failed");
        AppError::Unavailable("persistence backend is not reachable".into())
    })?;
    Ok("ready")
}
