//! ClubFlow API server - application entry point.
//!
//! A multi-tenant REST API for sports and social clubs: rosters, teams,
//! facility bookings, events, finances, announcements and club user
//! administration, gated by per-club roles and subscription plan limits.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries, embedded migrations)
//! - **Authentication**: bearer access tokens stored as SHA-256 hashes
//! - **Sync**: per-club change feed telling clients which cached queries to refetch
//!
//! # Startup Flow
//!
//! 1. Load and validate configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Ensure the bootstrap platform admin, if configured
//! 4. Build the router and serve until Ctrl+C or SIGTERM

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod permissions;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::{
    services::email_service::Mailer,
    state::{AppSettings, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controls verbosity, "info" by default
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env()?;
    config.validate()?;
    tracing::info!(email_enabled = config.email_enabled(), "Configuration loaded");

    let pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    if let Some((email, token)) = config.bootstrap_admin() {
        db::ensure_bootstrap_admin(&pool, email, token).await?;
    }

    let state = AppState::new(
        pool,
        Mailer::from_config(&config),
        AppSettings::from_config(&config),
    );
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
