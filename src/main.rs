//! Fraud Scoring Service - Main Entry Point
//!
//! Loads the fraud model once, then serves `/health`, `/predict` and `/metrics`.

use anyhow::Result;
use fraud_scoring_service::{
    config::{AppConfig, LogFormat, LoggingConfig},
    metrics::MetricsReporter,
    server, AppState, Scorer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;

    init_logging(&config.logging)?;
    info!("Starting Fraud Scoring Service");
    info!(
        host = %config.server.host,
        port = config.server.port,
        model_path = %config.models.model_path,
        jitter = config.scoring.jitter,
        "Configuration loaded"
    );

    // Model load failures downgrade to heuristic scoring instead of aborting
    let scorer = Scorer::from_config(&config);
    info!(mode = ?scorer.mode(), "Scorer initialized");

    let state = AppState::new(scorer);

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(state.metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    server::serve(state.clone(), &config.server).await?;

    info!("Service shutting down...");
    state.metrics.print_summary();

    Ok(())
}

/// Initialize tracing; `RUST_LOG` takes precedence over the configured level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!(
            "fraud_scoring_service={level},tower_http={level}",
            level = logging.level
        ))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }

    Ok(())
}
