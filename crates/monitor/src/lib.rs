//! Concurrent sampling, asynchronous checkpointing and failure recovery
//! for a fleet of simulated sensors.
//!
//! - [`StateStore`]: every module's mutable state behind one lock.
//! - [`CheckpointStore`]: atomic JSON record files, saved off the
//!   sampling path.
//! - [`Worker`]: one independent task per module.
//! - [`recovery::recover`]: restore a module from its checkpoint.
//! - [`Fleet`]: snapshot / command façade and worker lifecycle.

pub mod checkpoint;
pub mod config;
pub mod context;
pub mod error;
pub mod fleet;
pub mod recovery;
pub mod state;
pub mod worker;

pub use checkpoint::{CheckpointError, CheckpointRecord, CheckpointStore};
pub use config::MonitorConfig;
pub use context::MonitorContext;
pub use error::MonitorError;
pub use fleet::Fleet;
pub use recovery::RecoveryOutcome;
pub use state::{FleetSnapshot, ModuleSnapshot, ModuleSnapshots, ModuleState, StateStore};
pub use worker::{Tick, Worker, WorkerSettings};
