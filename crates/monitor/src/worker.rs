//! Per-module sampling / checkpoint / failure loop.
//!
//! One [`Worker`] runs per module as its own tokio task. Each tick either
//! recovers a failed module or produces a reading, schedules a checkpoint
//! when one is due, and rolls for a simulated failure. Checkpoints are
//! fire-and-forget: the worker never waits for the disk.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vitals_core::{epoch_secs, ModuleDescriptor, Reading, Status};
use vitals_events::LogLevel;

use crate::config::MonitorConfig;
use crate::context::MonitorContext;
use crate::recovery::{self, RecoveryOutcome};

/// Knobs shared by every worker in a fleet.
#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub period: Duration,
    pub failure_probability: f64,
    pub stagger_first_checkpoint: bool,
}

impl From<&MonitorConfig> for WorkerSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            period: config.sample_period,
            failure_probability: config.failure_probability,
            stagger_first_checkpoint: config.stagger_first_checkpoint,
        }
    }
}

/// What one iteration did.
#[derive(Debug)]
pub enum Tick {
    /// The module was failed; sampling was skipped and recovery ran.
    Recovered(RecoveryOutcome),
    Sampled {
        reading: Reading,
        sequence: u64,
        /// Handle to the detached save, if one was scheduled. Dropping it
        /// does not cancel the save.
        checkpoint: Option<JoinHandle<()>>,
        /// Whether this tick injected a spontaneous failure.
        failed: bool,
    },
    /// The module is no longer present in the state store.
    Missing,
}

/// Result of the locked part of a sampling tick.
enum SampleStep {
    Failed,
    Sampled { sequence: u64, checkpoint_due: bool },
}

pub struct Worker {
    ctx: MonitorContext,
    module: ModuleDescriptor,
    settings: WorkerSettings,
    rng: StdRng,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("module", &self.module)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Worker {
    pub fn new(ctx: MonitorContext, module: ModuleDescriptor, settings: WorkerSettings) -> Self {
        Self {
            ctx,
            module,
            settings,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Anchor the checkpoint schedule at the current time.
    ///
    /// With staggering on, the anchor sits half an interval in the past so
    /// modules do not all save on the same tick. The anchor never moves the
    /// epoch backwards.
    pub async fn prime(&self) {
        let interval = self.module.checkpoint_interval_secs;
        let offset = if self.settings.stagger_first_checkpoint {
            (interval / 2) as f64
        } else {
            0.0
        };
        let anchor = epoch_secs(self.ctx.clock.now()) - offset;
        self.ctx
            .state
            .update(&self.module.name, |s| {
                if anchor > s.last_checkpoint_epoch {
                    s.last_checkpoint_epoch = anchor;
                }
            })
            .await;
    }

    /// Run one iteration.
    pub async fn tick(&mut self) -> Tick {
        let name = self.module.name.clone();
        let reading = self.module.range.sample(&mut self.rng);
        let now = self.ctx.clock.now();
        let now_epoch = epoch_secs(now);
        let value_time = self.ctx.zone.format(now);
        let interval = self.module.checkpoint_interval_secs as f64;

        // The failed check and the sample share one lock section so a
        // concurrent trigger_failure can never be overtaken by a sample.
        let step = self
            .ctx
            .state
            .update(&name, |s| {
                if s.failed {
                    s.status = Status::Recovering;
                    return SampleStep::Failed;
                }
                let sequence = s.record_sample(reading, value_time);
                let checkpoint_due = now_epoch - s.last_checkpoint_epoch >= interval;
                if checkpoint_due {
                    s.status = Status::Checkpointing;
                }
                SampleStep::Sampled {
                    sequence,
                    checkpoint_due,
                }
            })
            .await;

        let (sequence, checkpoint_due) = match step {
            None => return Tick::Missing,
            Some(SampleStep::Failed) => {
                tracing::debug!(module = %name, "Module failed, recovering");
                let outcome = recovery::recover(&self.ctx, &self.module).await;
                return Tick::Recovered(outcome);
            }
            Some(SampleStep::Sampled {
                sequence,
                checkpoint_due,
            }) => (sequence, checkpoint_due),
        };

        let checkpoint = checkpoint_due.then(|| {
            tracing::debug!(module = %name, sequence, "Checkpoint due, scheduling save");
            self.ctx.checkpoints.save_async(&self.module, reading)
        });

        let failed = self.roll_failure();
        if failed {
            self.ctx.state.update(&name, |s| s.mark_failed()).await;
            self.ctx
                .log
                .record(
                    LogLevel::Error,
                    format!("{name}: spontaneous failure (simulated)"),
                )
                .await;
        }

        Tick::Sampled {
            reading,
            sequence,
            checkpoint,
            failed,
        }
    }

    /// Loop until `cancel` fires, sleeping one period between ticks.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.prime().await;
        tracing::info!(
            module = %self.module.name,
            period_ms = self.settings.period.as_millis() as u64,
            checkpoint_interval_secs = self.module.checkpoint_interval_secs,
            "Worker started",
        );

        loop {
            if let Tick::Missing = self.tick().await {
                tracing::error!(module = %self.module.name, "Module state missing, worker exiting");
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.period) => {}
            }
        }

        tracing::info!(module = %self.module.name, "Worker stopped");
    }

    fn roll_failure(&mut self) -> bool {
        let p = self.settings.failure_probability;
        p > 0.0 && self.rng.random_bool(p.min(1.0))
    }
}
