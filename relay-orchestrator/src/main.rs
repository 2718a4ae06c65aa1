use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_orchestrator=debug,relay_engine=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relay Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Releasing {}/{}@{} to {}, {}, {}",
        config.source.owner,
        config.source.repo,
        config.source.branch,
        config.targets.migration,
        config.targets.application,
        config.targets.cleanup
    );

    let (state, workers) = AppState::from_config(&config).await?;

    let recovered = state
        .train
        .recover()
        .await
        .context("Failed to recover queued runs")?;
    if recovered > 0 {
        tracing::info!("Recovered {} queued run(s)", recovered);
    }

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    workers.train.abort();
    if let Some(maintenance) = workers.maintenance {
        maintenance.abort();
    }

    Ok(())
}
