//! Periodic fleet snapshot report.
//!
//! Spawned by the agent alongside the fleet. Each interval it takes one
//! snapshot and traces a summary line plus one line per module. Runs
//! until cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use vitals_core::Status;
use vitals_monitor::{Fleet, FleetSnapshot};

/// Fleet-wide counts derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub modules: usize,
    pub failed: usize,
    /// Modules currently showing `Checkpoint Error`.
    pub checkpoint_errors: usize,
    /// Modules with at least one completed checkpoint.
    pub checkpointed: usize,
}

pub fn summarize(snapshot: &FleetSnapshot) -> Summary {
    snapshot
        .modules
        .values()
        .fold(Summary::default(), |mut acc, module| {
            acc.modules += 1;
            if module.failed {
                acc.failed += 1;
            }
            if module.status == Status::CheckpointError {
                acc.checkpoint_errors += 1;
            }
            if module.last_checkpoint.is_some() {
                acc.checkpointed += 1;
            }
            acc
        })
}

/// Trace one snapshot and return its summary.
pub async fn report(fleet: &Fleet) -> Summary {
    let snapshot = fleet.snapshot().await;
    let summary = summarize(&snapshot);

    tracing::info!(
        time = %snapshot.time,
        modules = summary.modules,
        failed = summary.failed,
        checkpoint_errors = summary.checkpoint_errors,
        checkpointed = summary.checkpointed,
        "Fleet snapshot",
    );

    for (name, module) in &snapshot.modules {
        match &module.value {
            Some(value) => tracing::debug!(
                module = %name,
                value = %value,
                unit = %module.unit,
                status = %module.status,
                seq = module.sequence,
                "Module reading",
            ),
            None => tracing::debug!(module = %name, status = %module.status, "Module has no reading yet"),
        }
    }

    summary
}

/// Run the report loop until `cancel` is triggered.
pub async fn run(fleet: Arc<Fleet>, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Snapshot reporter started");

    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; skip it so the first report
    // carries at least one interval of samples.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Snapshot reporter stopping");
                break;
            }
            _ = interval.tick() => {
                let summary = report(&fleet).await;
                if summary.checkpoint_errors > 0 {
                    tracing::warn!(count = summary.checkpoint_errors, "Modules reporting checkpoint errors");
                }
            }
        }
    }
}
