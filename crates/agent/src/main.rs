//! `vitals-agent` -- simulated patient-monitor daemon.
//!
//! Starts one sampling worker per sensor module, checkpoints their values
//! to disk, injects and recovers from simulated failures, and records
//! every notable event in a durable log. Runs until Ctrl-C.
//!
//! # Environment variables
//!
//! See [`AgentConfig::from_env`] for the full table. `RUST_LOG` controls
//! diagnostic verbosity; `LOG_FORMAT=json` switches to JSON output.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitals_agent::config::AgentConfig;
use vitals_agent::reporter;
use vitals_events::LogLevel;
use vitals_monitor::Fleet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AgentConfig::from_env()?;
    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Cannot create data directory {}", config.data_dir.display()))?;

    let monitor_config = config.monitor_config()?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        log_file = %monitor_config.log_file.display(),
        modules = monitor_config.modules.len(),
        sample_period_ms = config.sample_period.as_millis() as u64,
        failure_probability = config.failure_probability,
        "Starting vitals-agent",
    );

    let fleet = Arc::new(Fleet::new(monitor_config)?);
    fleet
        .context()
        .log
        .record(LogLevel::Info, "System starting")
        .await;
    fleet.start().await;

    let cancel = CancellationToken::new();
    let reporter_handle = config.report_interval.map(|every| {
        tokio::spawn(reporter::run(Arc::clone(&fleet), every, cancel.child_token()))
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    if let Some(handle) = reporter_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Reporter task ended abnormally");
        }
    }
    fleet.shutdown().await;

    tracing::info!("vitals-agent stopped");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitals_agent=info,vitals_monitor=info,vitals_events=info".into());

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
