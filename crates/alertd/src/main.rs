//! Alerting Service - Main Entry Point
//!
//! Loads configuration, constructs the service once, and sends a test alert
//! through every enabled channel. Prints the resulting stats as JSON.

use anyhow::Context;
use perf_alerting::{AlertService, AlertingConfig};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging; `ALERTD_LOG_JSON=1` selects JSON output
fn init_logging() -> anyhow::Result<()> {
    let json = std::env::var("ALERTD_LOG_JSON").map_or(false, |v| v == "1" || v == "true");
    let builder = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.context("Failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    info!("=== alertd v{} ===", env!("CARGO_PKG_VERSION"));

    let config = AlertingConfig::load().context("Failed to load alerting configuration")?;
    let service = Arc::new(AlertService::new(config));

    match service.test_alerts().await {
        Some(alert) if alert.delivered_channels.is_empty() => {
            warn!("Test alert {} reached no channel", alert.id);
        }
        Some(alert) => {
            info!("Test alert {} delivered via {:?}", alert.id, alert.delivered_channels);
        }
        None => warn!("Test alert suppressed"),
    }

    let stats = serde_json::to_string_pretty(&service.get_alert_stats())?;
    println!("{}", stats);

    Ok(())
}
