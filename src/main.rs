//! Job Aggregator — Binary Entrypoint
//! Boots the Axum HTTP server around an explicitly constructed
//! `AggregationManager`.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_aggregator::aggregator::AggregationManager;
use job_aggregator::api::{create_router, AppState};
use job_aggregator::config::AggregatorConfig;
use job_aggregator::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AggregatorConfig::load_default()?;
    let mut manager = AggregationManager::new();
    manager.initialize(&config)?;
    tracing::info!(providers = ?manager.provider_names(), "aggregation manager initialized");

    let metrics = Metrics::init(manager.provider_names().len());
    let state = AppState {
        manager: Arc::new(manager),
    };
    let router = create_router(state).merge(metrics.router());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "job aggregator listening");
    axum::serve(listener, router).await?;
    Ok(())
}
