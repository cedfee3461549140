//! Atomic per-module checkpoint persistence.
//!
//! Each module owns one JSON record file. Writes go to a temporary file in
//! the same directory and are renamed over the final path, so a crash
//! before the rename leaves the previous record (or none) intact. The
//! temporary file is removed on every failure path.
//!
//! [`CheckpointStore::save_async`] spawns a detached task: the caller never
//! waits for the disk, and the task re-acquires the state lock on its own
//! to record the outcome.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use vitals_core::{epoch_secs, Clock, DisplayZone, ModuleDescriptor, Reading, Status};
use vitals_events::{EventLog, LogLevel};

use crate::state::StateStore;

/// Prefix for in-flight temporary files next to the final record.
const TEMP_PREFIX: &str = ".ckpt_";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Durable snapshot of a module's last known value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub module: String,
    pub value: Reading,
    pub unit: String,
    /// Human-readable save time.
    pub time: String,
    /// Save time in epoch seconds.
    pub epoch: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("checkpoint record is malformed: {0}")]
    Format(#[from] serde_json::Error),

    #[error("checkpoint task aborted: {0}")]
    Task(String),
}

// ---------------------------------------------------------------------------
// File primitives
// ---------------------------------------------------------------------------

/// Write `record` to `path` via temp-file-then-rename in the same directory.
pub fn write_atomic(path: &Path, record: &CheckpointRecord) -> Result<(), CheckpointError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // Dropping `tmp` on any early return deletes the temporary file.
    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    serde_json::to_writer(&mut tmp, record)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CheckpointError::Io(e.error))?;
    Ok(())
}

/// Read the record at `path`. `Ok(None)` if no file exists.
pub async fn read_record(path: &Path) -> Result<Option<CheckpointRecord>, CheckpointError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of every checkpoint file. Nothing else writes them.
pub struct CheckpointStore {
    state: Arc<StateStore>,
    log: Arc<EventLog>,
    clock: Arc<dyn Clock>,
    zone: DisplayZone,
}

impl CheckpointStore {
    pub fn new(
        state: Arc<StateStore>,
        log: Arc<EventLog>,
        clock: Arc<dyn Clock>,
        zone: DisplayZone,
    ) -> Self {
        Self {
            state,
            log,
            clock,
            zone,
        }
    }

    /// Schedule a save without blocking the caller.
    ///
    /// The returned handle may be dropped; the task keeps running detached.
    pub fn save_async(self: &Arc<Self>, module: &ModuleDescriptor, value: Reading) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let module = module.clone();
        tokio::spawn(async move {
            // Outcome is already reflected in state and the event log.
            let _ = store.save(&module, value).await;
        })
    }

    /// Persist `value` and record the outcome.
    ///
    /// On success the module's checkpoint bookkeeping moves forward and its
    /// status returns to `Active` unless it is failed. On error the status
    /// becomes `Checkpoint Error`. Both outcomes are logged.
    pub async fn save(
        &self,
        module: &ModuleDescriptor,
        value: Reading,
    ) -> Result<CheckpointRecord, CheckpointError> {
        let now = self.clock.now();
        let record = CheckpointRecord {
            module: module.name.clone(),
            value,
            unit: module.unit.clone(),
            time: self.zone.format(now),
            epoch: epoch_secs(now),
        };

        let path = module.checkpoint_file.clone();
        let to_write = record.clone();
        let written = tokio::task::spawn_blocking(move || write_atomic(&path, &to_write))
            .await
            .map_err(|e| CheckpointError::Task(e.to_string()))
            .and_then(|result| result);

        match written {
            Ok(()) => {
                let (time, epoch) = (record.time.clone(), record.epoch);
                self.state
                    .update(&module.name, |s| {
                        s.advance_checkpoint(time, epoch);
                        if !s.failed {
                            s.status = Status::Active;
                        }
                    })
                    .await;
                tracing::debug!(module = %module.name, path = %module.checkpoint_file.display(), "Checkpoint written");
                self.log
                    .record(
                        LogLevel::Success,
                        format!("{}: checkpoint saved @ {}", module.name, record.time),
                    )
                    .await;
                Ok(record)
            }
            Err(e) => {
                self.state
                    .update(&module.name, |s| {
                        if !s.failed {
                            s.status = Status::CheckpointError;
                        }
                    })
                    .await;
                self.log
                    .record(
                        LogLevel::Error,
                        format!("{}: checkpoint save failed ({e})", module.name),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Load the module's record.
    ///
    /// `Ok(None)` when no checkpoint exists. A record that exists but cannot
    /// be read or parsed is logged and returned as an error; recovery
    /// treats it the same as a missing record.
    pub async fn load(
        &self,
        module: &ModuleDescriptor,
    ) -> Result<Option<CheckpointRecord>, CheckpointError> {
        match read_record(&module.checkpoint_file).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.log
                    .record(
                        LogLevel::Error,
                        format!("{}: checkpoint load failed ({e})", module.name),
                    )
                    .await;
                Err(e)
            }
        }
    }

    /// Delete the module's record. Returns whether a file was removed.
    pub async fn remove(&self, module: &ModuleDescriptor) -> Result<bool, CheckpointError> {
        match tokio::fs::remove_file(&module.checkpoint_file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
