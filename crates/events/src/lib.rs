//! Durable operational event log for the vitals fleet.
//!
//! - [`EventLog`]: append-only JSON-lines file with a dedicated lock and
//!   skip-tolerant reads.
//! - [`LogEntry`] / [`LogLevel`]: the on-disk record.

pub mod entry;
pub mod log;

pub use entry::{LogEntry, LogLevel};
pub use log::{EventLog, EventLogError, DEFAULT_RECENT_LOGS};
