//! Restoring a module's value from its checkpoint.
//!
//! Recovery always clears `failed`, whether or not a record existed, so a
//! failure episode lasts a single worker tick when the store is healthy.

use vitals_core::{ModuleDescriptor, Status};
use vitals_events::LogLevel;

use crate::checkpoint::CheckpointRecord;
use crate::context::MonitorContext;

/// What a recovery attempt found.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    /// The module's value was restored from this record.
    Restored(CheckpointRecord),
    /// No usable record; the module resumes sampling from scratch.
    NoCheckpoint,
}

impl RecoveryOutcome {
    pub fn status(&self) -> Status {
        match self {
            RecoveryOutcome::Restored(_) => Status::Recovered,
            RecoveryOutcome::NoCheckpoint => Status::NoCheckpoint,
        }
    }
}

/// Load `module`'s checkpoint and apply it to the module state.
///
/// An unreadable record counts as no checkpoint; its load error has
/// already been logged by the store. `last_checkpoint_epoch` is left alone
/// so recovery never resets the checkpoint-due timer.
pub async fn recover(ctx: &MonitorContext, module: &ModuleDescriptor) -> RecoveryOutcome {
    let loaded = ctx.checkpoints.load(module).await.ok().flatten();

    let outcome = match loaded {
        Some(record) => RecoveryOutcome::Restored(record),
        None => RecoveryOutcome::NoCheckpoint,
    };

    ctx.state
        .update(&module.name, |s| {
            if let RecoveryOutcome::Restored(record) = &outcome {
                s.value = Some(record.value);
                s.last_checkpoint_time = Some(record.time.clone());
            }
            s.status = outcome.status();
            s.failed = false;
        })
        .await;

    match &outcome {
        RecoveryOutcome::Restored(record) => {
            ctx.log
                .record(
                    LogLevel::Success,
                    format!("{}: recovered from checkpoint @ {}", module.name, record.time),
                )
                .await;
        }
        RecoveryOutcome::NoCheckpoint => {
            ctx.log
                .record(
                    LogLevel::Warn,
                    format!("{}: no checkpoint available for recovery", module.name),
                )
                .await;
        }
    }

    outcome
}
