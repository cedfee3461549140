//! Agent configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use vitals_core::module::DEFAULT_CHECKPOINT_DIR;
use vitals_core::{default_fleet, DisplayZone};
use vitals_monitor::config::{DEFAULT_FAILURE_PROBABILITY, DEFAULT_LOG_FILE};
use vitals_monitor::MonitorConfig;

/// Default period between sampling ticks, in milliseconds.
const DEFAULT_SAMPLE_PERIOD_MS: u64 = 1000;

/// Default interval between snapshot reports, in seconds.
const DEFAULT_REPORT_INTERVAL_SECS: u64 = 10;

/// Default display offset: UTC+05:30.
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Runtime settings for the agent daemon.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    /// Root for the checkpoint directory and event log.
    pub data_dir: PathBuf,
    /// Checkpoint directory, relative to `data_dir` unless absolute.
    pub checkpoint_dir: PathBuf,
    /// Event log file, relative to `data_dir` unless absolute.
    pub log_file: PathBuf,
    pub sample_period: Duration,
    pub failure_probability: f64,
    /// `None` disables the periodic snapshot report.
    pub report_interval: Option<Duration>,
    pub utc_offset_minutes: i32,
}

impl AgentConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default       |
    /// |-------------------------------|---------------|
    /// | `VITALS_DATA_DIR`             | `.`           |
    /// | `VITALS_CHECKPOINT_DIR`       | `checkpoints` |
    /// | `VITALS_LOG_FILE`             | `events.log`  |
    /// | `VITALS_SAMPLE_PERIOD_MS`     | `1000`        |
    /// | `VITALS_FAILURE_PROBABILITY`  | `0.01`        |
    /// | `VITALS_REPORT_INTERVAL_SECS` | `10` (`0` = off) |
    /// | `VITALS_UTC_OFFSET_MINUTES`   | `330`         |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`, so tests need not touch the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let data_dir = lookup("VITALS_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let checkpoint_dir = lookup("VITALS_CHECKPOINT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT_DIR));
        let log_file = lookup("VITALS_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        let sample_period_ms: u64 =
            parse_or(&lookup, "VITALS_SAMPLE_PERIOD_MS", DEFAULT_SAMPLE_PERIOD_MS)?;
        if sample_period_ms == 0 {
            anyhow::bail!("VITALS_SAMPLE_PERIOD_MS must be greater than zero");
        }

        let failure_probability: f64 = parse_or(
            &lookup,
            "VITALS_FAILURE_PROBABILITY",
            DEFAULT_FAILURE_PROBABILITY,
        )?;
        if !(0.0..=1.0).contains(&failure_probability) {
            anyhow::bail!("VITALS_FAILURE_PROBABILITY must be within [0, 1], got {failure_probability}");
        }

        let report_secs: u64 = parse_or(
            &lookup,
            "VITALS_REPORT_INTERVAL_SECS",
            DEFAULT_REPORT_INTERVAL_SECS,
        )?;

        let utc_offset_minutes: i32 = parse_or(
            &lookup,
            "VITALS_UTC_OFFSET_MINUTES",
            DEFAULT_UTC_OFFSET_MINUTES,
        )?;

        Ok(Self {
            data_dir,
            checkpoint_dir,
            log_file,
            sample_period: Duration::from_millis(sample_period_ms),
            failure_probability,
            report_interval: (report_secs > 0).then(|| Duration::from_secs(report_secs)),
            utc_offset_minutes,
        })
    }

    /// Resolve paths against the data directory and build the fleet config.
    pub fn monitor_config(&self) -> anyhow::Result<MonitorConfig> {
        let zone = DisplayZone::from_offset_minutes(self.utc_offset_minutes)
            .context("VITALS_UTC_OFFSET_MINUTES is not a valid offset")?;

        let mut config = MonitorConfig::new(&self.data_dir);
        config.modules = default_fleet(&self.data_dir.join(&self.checkpoint_dir));
        config.log_file = self.data_dir.join(&self.log_file);
        config.sample_period = self.sample_period;
        config.failure_probability = self.failure_probability;
        config.zone = zone;

        config.validate().context("Invalid monitor configuration")?;
        Ok(config)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
