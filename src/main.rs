//! Ledger Service - Main Application Entry Point
//!
//! REST API server for opening accounts, moving money and reading
//! transaction history.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. With `DATABASE_URL`: create the connection pool and run migrations;
//!    without it: fall back to in-memory storage
//! 3. Build HTTP router
//! 4. Start server on configured port

use std::sync::Arc;

use ledger_server::{
    LedgerEngine, MemoryStorage, PgStorage, Storage, app, config::Config, db,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(policy = ?config.policy(), "Configuration loaded");

    match config.database_url.as_deref() {
        Some(database_url) => {
            let pool =
                db::connect(database_url, config.db_max_connections, config.lock_timeout()).await?;
            tracing::info!("Database pool created");

            db::migrate(&pool).await?;
            tracing::info!("Database migrations complete");

            let storage = PgStorage::new(pool, config.lock_timeout());
            serve(storage, &config).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            serve(MemoryStorage::new(config.lock_timeout()), &config).await
        }
    }
}

async fn serve<S: Storage>(storage: S, config: &Config) -> anyhow::Result<()> {
    let engine = Arc::new(LedgerEngine::new(storage, config.policy()));
    let app = app::router(engine);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
