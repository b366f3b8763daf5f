use anyhow::Result;
use sqlx::migrate::Migrator;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod accounts;
mod csrf;
mod error;
mod forms;
mod models;
mod repositories;
mod routes;
mod session;
mod settings;
mod state;
mod templates;

use common::database::{DatabaseConfig, connect_with_retry, run_migrations};

use crate::{
    repositories::PgUserStore, settings::Settings, state::AppState, templates::Templates,
};

static MIGRATOR: Migrator = sqlx::migrate!();

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting portal service");

    let settings = Settings::from_env()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = connect_with_retry(&db_config).await?;
    run_migrations(&pool, &MIGRATOR).await?;

    let templates = Templates::new()?;
    let app_state = AppState::new(Arc::new(PgUserStore::new(pool)), templates, &settings);

    info!("Portal service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state, &settings.static_dir);

    let addr = settings.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Portal service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Portal service stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
