//! Signed Operations - Main Application Entry Point
//!
//! REST API server for managing application credentials and authenticating
//! signed machine-to-machine requests.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Optionally preload the credential cache
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::sync::Arc;

use signed_ops::{
    app::{self, AppState, Settings},
    config::Config,
    db,
    logger::TracingLogger,
    store::PgCredentialStore,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let logger = Arc::new(TracingLogger);
    let store = Arc::new(PgCredentialStore::new(pool.clone(), logger.clone()));
    let state = AppState::new(pool, store, logger, Settings::from(&config));

    if config.credential_cache_preload {
        state.preload_credentials().await?;
    }

    let app = app::router(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
