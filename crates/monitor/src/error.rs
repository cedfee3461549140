use vitals_core::CoreError;
use vitals_events::EventLogError;

/// Errors surfaced by the fleet façade.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// No module with this name is configured.
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] CoreError),

    #[error(transparent)]
    EventLog(#[from] EventLogError),
}
