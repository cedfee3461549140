//! Query / command façade over a running fleet of module workers.
//!
//! [`Fleet`] is created once at startup. [`Fleet::start`] spawns one worker
//! task per module under a master cancellation token; [`Fleet::shutdown`]
//! cancels it, and a later `start` runs under a fresh one. Every query and
//! command goes through the same state lock the workers use, so it is safe
//! to call from any task or thread.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vitals_core::{Clock, ModuleDescriptor, Reading, Status, SystemClock};
use vitals_events::{LogEntry, LogLevel};

use crate::config::MonitorConfig;
use crate::context::MonitorContext;
use crate::error::MonitorError;
use crate::recovery::{self, RecoveryOutcome};
use crate::state::{FleetSnapshot, ModuleState};
use crate::worker::{Worker, WorkerSettings};

/// How long shutdown waits for each worker to exit.
const WORKER_STOP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Bookkeeping for one spawned worker task.
struct ManagedWorker {
    module: String,
    handle: JoinHandle<()>,
}

/// Running workers and the token that stops them.
struct WorkerSet {
    /// Master token; each worker runs on a child of it.
    cancel: CancellationToken,
    running: Vec<ManagedWorker>,
}

pub struct Fleet {
    ctx: MonitorContext,
    settings: WorkerSettings,
    workers: Mutex<WorkerSet>,
}

impl Fleet {
    /// Validate `config` and build a fleet on the system clock.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: MonitorConfig, clock: Arc<dyn Clock>) -> Result<Self, MonitorError> {
        config.validate()?;
        Ok(Self {
            ctx: MonitorContext::new(&config, clock),
            settings: WorkerSettings::from(&config),
            workers: Mutex::new(WorkerSet {
                cancel: CancellationToken::new(),
                running: Vec::new(),
            }),
        })
    }

    pub fn context(&self) -> &MonitorContext {
        &self.ctx
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.ctx.modules
    }

    /// Build a worker for `name` without spawning it.
    pub fn worker(&self, name: &str) -> Result<Worker, MonitorError> {
        let module = self.descriptor(name)?.clone();
        Ok(Worker::new(self.ctx.clone(), module, self.settings))
    }

    // ---- lifecycle ----

    /// Spawn one worker task per module. A second call while running is a
    /// no-op; a call after [`shutdown`](Self::shutdown) restarts the fleet.
    pub async fn start(&self) {
        let mut workers = self.workers.lock().await;
        if !workers.running.is_empty() {
            tracing::warn!("Fleet already started");
            return;
        }
        if workers.cancel.is_cancelled() {
            workers.cancel = CancellationToken::new();
        }

        for module in self.ctx.modules.iter() {
            let worker = Worker::new(self.ctx.clone(), module.clone(), self.settings);
            let handle = tokio::spawn(worker.run(workers.cancel.child_token()));
            workers.running.push(ManagedWorker {
                module: module.name.clone(),
                handle,
            });
        }

        tracing::info!(count = workers.running.len(), "Fleet workers spawned");
    }

    /// Cancel every worker and wait briefly for each to exit.
    ///
    /// In-flight checkpoint saves are detached and finish on their own.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down fleet");

        let mut workers = self.workers.lock().await;
        workers.cancel.cancel();
        for managed in workers.running.drain(..) {
            if tokio::time::timeout(WORKER_STOP_TIMEOUT, managed.handle)
                .await
                .is_err()
            {
                tracing::warn!(module = %managed.module, "Worker did not stop in time");
            }
        }

        tracing::info!("Fleet shut down complete");
    }

    // ---- queries ----

    /// Consistent point-in-time view of every module.
    pub async fn snapshot(&self) -> FleetSnapshot {
        self.ctx
            .state
            .snapshot(&self.ctx.modules, self.ctx.display_now())
            .await
    }

    /// The module's bounded reading window, oldest first.
    pub async fn history(&self, name: &str) -> Result<Vec<Reading>, MonitorError> {
        self.ctx
            .state
            .inspect(name, |s| s.history.to_vec())
            .await
            .ok_or_else(|| MonitorError::UnknownModule(name.to_string()))
    }

    /// Up to `limit` event log entries, newest first.
    pub async fn recent_logs(&self, limit: usize) -> Result<Vec<LogEntry>, MonitorError> {
        Ok(self.ctx.log.read_recent(limit).await?)
    }

    /// Raw bytes of the event log file.
    pub async fn download_log(&self) -> Result<Vec<u8>, MonitorError> {
        Ok(self.ctx.log.read_raw().await?)
    }

    // ---- commands ----

    /// Simulate a crash. The module's worker recovers it on its next tick.
    pub async fn trigger_failure(&self, name: &str) -> Result<(), MonitorError> {
        self.ctx
            .state
            .update(name, ModuleState::mark_failed)
            .await
            .ok_or_else(|| MonitorError::UnknownModule(name.to_string()))?;

        self.ctx
            .log
            .record(LogLevel::Error, format!("{name}: manual failure triggered"))
            .await;
        Ok(())
    }

    /// Recover immediately instead of waiting for the worker to notice.
    pub async fn trigger_recovery(&self, name: &str) -> Result<RecoveryOutcome, MonitorError> {
        let module = self.descriptor(name)?;
        self.ctx
            .state
            .update(name, |s| {
                s.failed = false;
                s.status = Status::Recovering;
            })
            .await
            .ok_or_else(|| MonitorError::UnknownModule(name.to_string()))?;

        Ok(recovery::recover(&self.ctx, module).await)
    }

    /// Delete every checkpoint, truncate the event log and return every
    /// module to its startup default.
    ///
    /// Runs under the state write lock. Individual delete failures are
    /// reported through `tracing` and do not stop the reset. Returns the
    /// number of checkpoint files removed.
    pub async fn reset_all(&self) -> usize {
        let removed = {
            let mut modules = self.ctx.state.write().await;

            let mut removed = 0;
            for module in self.ctx.modules.iter() {
                match self.ctx.checkpoints.remove(module).await {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(module = %module.name, error = %e, "Failed to delete checkpoint during reset");
                    }
                }
            }

            if let Err(e) = self.ctx.log.truncate().await {
                tracing::warn!(error = %e, "Failed to truncate event log during reset");
            }

            for state in modules.values_mut() {
                *state = ModuleState::default();
            }
            removed
        };

        self.ctx
            .log
            .record(LogLevel::Info, "System reset: checkpoints and logs cleared")
            .await;
        removed
    }

    fn descriptor(&self, name: &str) -> Result<&ModuleDescriptor, MonitorError> {
        self.ctx
            .module(name)
            .ok_or_else(|| MonitorError::UnknownModule(name.to_string()))
    }
}

impl Drop for Fleet {
    fn drop(&mut self) {
        self.workers.get_mut().cancel.cancel();
    }
}
