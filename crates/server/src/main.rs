//! ExoScope server - exoplanet candidate classification and radius regression
//!
//! Loads both ONNX models and their metadata at startup, then serves
//! predictions over HTTP and records each one in the SQLite prediction log.

use anyhow::{Context, Result};
use exoscope_lib::PredictionService;
use exoscope_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting exoscope-server");

    let config = ServerConfig::load()?;
    let paths = config.artifact_paths();
    info!(
        artifact_dir = %config.artifact_dir.display(),
        database = %paths.database.display(),
        "Server configured"
    );

    // Missing or unreadable artifacts abort startup
    let service = PredictionService::load(&paths).context("failed to load model artifacts")?;

    let state = Arc::new(api::AppState::new(service));
    api::serve(&config.bind_addr(), state).await?;

    info!("Shutdown complete");
    Ok(())
}
