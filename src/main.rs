//! Campaign Revenue Predictor - Main Entry Point
//!
//! Loads the trained model and encoders, then serves the EDA and prediction
//! endpoints over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use revenue_predictor::{
    api::{self, AppState},
    config::{AppConfig, DEFAULT_CONFIG_PATH},
    logging::init_logging,
    metrics::{MetricsReporter, ServiceMetrics},
    models::loader::ArtifactStore,
    service::PredictionService,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "revenue-predictor")]
#[command(about = "Serve campaign revenue predictions over HTTP")]
struct Args {
    /// Configuration file (missing file falls back to defaults)
    #[arg(short, long, env = "REVENUE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the artifact directory from the configuration
    #[arg(long)]
    artifacts: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load_or_default(&args.config)?;
    if let Some(dir) = args.artifacts {
        config.artifacts.dir = dir;
    }

    init_logging(&config.logging)?;
    info!("Starting Campaign Revenue Predictor");
    info!(config = %args.config, "Configuration loaded");

    // Load model and encoders once; they are read-only from here on
    let store = ArtifactStore::from_config(&config.artifacts);
    let artifacts = store
        .load()
        .with_context(|| format!("Failed to load artifacts from {}", store.dir().display()))?;
    let service = PredictionService::new(Arc::new(artifacts.model), Arc::new(artifacts.encoders));
    info!(
        model = service.model_name(),
        ad_groups = service.encoders().ad_group.len(),
        months = service.encoders().month.len(),
        "Prediction service initialized"
    );

    let metrics = Arc::new(ServiceMetrics::new());
    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = api::router(AppState::new(service, metrics.clone()), config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
