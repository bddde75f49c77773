//! # campus-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the moderation API.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use campus_api::persistence::{MemoryPersistence, Persistence};
use campus_api::state::{AppConfig, AppState, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build configuration from environment.
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "configuration loaded");

    // Initialize database pool (optional, absent means in-memory only).
    let db_pool = campus_api::db::init_pool(config.database_url.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;
    let store: Arc<dyn Persistence> = match db_pool {
        Some(pool) => Arc::new(campus_api::db::PgPersistence::new(pool)),
        None => Arc::new(MemoryPersistence::new()),
    };

    let port = config.port;
    let state = AppState::with_config(config, store);
    let app = campus_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("campus-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
