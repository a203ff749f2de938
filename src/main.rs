//! Analytics Rollup Service — Binary Entrypoint
//! Boots the Axum HTTP server: engine routes, Prometheus exposition,
//! CORS for the dashboard frontend.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use note_analytics_engine::config::EngineConfig;
use note_analytics_engine::metrics::Metrics;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("note_analytics_engine=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics = Metrics::init();
    let config = EngineConfig::load();
    info!(
        proposal_stage = %config.proposal_stage_name,
        spike_sigma = config.spike_sigma,
        above_average_factor = config.above_average_factor,
        "engine config loaded"
    );

    let router = note_analytics_engine::api::create_router_with_config(config)
        .merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}
