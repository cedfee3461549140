use std::path::{Path, PathBuf};
use std::time::Duration;

use vitals_core::module::DEFAULT_CHECKPOINT_DIR;
use vitals_core::{default_fleet, validate_fleet, CoreError, DisplayZone, ModuleDescriptor};

/// Default worker period: one sampling tick per second.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

/// Default chance of a spontaneous failure on any given tick.
pub const DEFAULT_FAILURE_PROBABILITY: f64 = 0.01;

/// Default event log file name, relative to the data directory.
pub const DEFAULT_LOG_FILE: &str = "events.log";

/// Resolved runtime configuration for a [`Fleet`](crate::Fleet).
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Sensors to simulate. Their checkpoint paths are absolute or relative
    /// to the process working directory.
    pub modules: Vec<ModuleDescriptor>,
    pub log_file: PathBuf,
    pub sample_period: Duration,
    /// Probability in `[0, 1]` of a simulated failure per tick.
    pub failure_probability: f64,
    /// Anchor each worker's checkpoint schedule half an interval in the
    /// past at start, so the first save lands after `interval / 2`.
    pub stagger_first_checkpoint: bool,
    pub zone: DisplayZone,
}

impl MonitorConfig {
    /// Defaults rooted at `data_dir`: the stock fleet checkpointing into
    /// `data_dir/checkpoints`, events in `data_dir/events.log`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            modules: default_fleet(&data_dir.join(DEFAULT_CHECKPOINT_DIR)),
            log_file: data_dir.join(DEFAULT_LOG_FILE),
            sample_period: DEFAULT_SAMPLE_PERIOD,
            failure_probability: DEFAULT_FAILURE_PROBABILITY,
            stagger_first_checkpoint: true,
            zone: DisplayZone::default(),
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        validate_fleet(&self.modules)?;
        if self.sample_period.is_zero() {
            return Err(CoreError::Validation(
                "Sample period must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(CoreError::Validation(format!(
                "Failure probability {} must be within [0, 1]",
                self.failure_probability
            )));
        }
        if self.log_file.file_name().is_none() {
            return Err(CoreError::Validation(
                "Event log path must name a file".to_string(),
            ));
        }
        Ok(())
    }
}
