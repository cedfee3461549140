//! Shared handles threaded through workers and the façade.

use std::sync::Arc;

use vitals_core::{Clock, DisplayZone, ModuleDescriptor};
use vitals_events::EventLog;

use crate::checkpoint::CheckpointStore;
use crate::config::MonitorConfig;
use crate::state::StateStore;

/// Everything a worker or command needs, cheap to clone.
///
/// The state lock lives in [`StateStore`]; the event log keeps its own
/// lock, so logging never holds up state access.
#[derive(Clone)]
pub struct MonitorContext {
    pub modules: Arc<[ModuleDescriptor]>,
    pub state: Arc<StateStore>,
    pub checkpoints: Arc<CheckpointStore>,
    pub log: Arc<EventLog>,
    pub clock: Arc<dyn Clock>,
    pub zone: DisplayZone,
}

impl MonitorContext {
    pub fn new(config: &MonitorConfig, clock: Arc<dyn Clock>) -> Self {
        let modules: Arc<[ModuleDescriptor]> = config.modules.clone().into();
        let state = Arc::new(StateStore::new(&modules));
        let log = Arc::new(EventLog::new(
            config.log_file.clone(),
            config.zone,
            Arc::clone(&clock),
        ));
        let checkpoints = Arc::new(CheckpointStore::new(
            Arc::clone(&state),
            Arc::clone(&log),
            Arc::clone(&clock),
            config.zone,
        ));
        Self {
            modules,
            state,
            checkpoints,
            log,
            clock,
            zone: config.zone,
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Current time in the display zone.
    pub fn display_now(&self) -> String {
        self.zone.format(self.clock.now())
    }
}
