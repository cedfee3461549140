//! Append-only newline-delimited JSON event log.
//!
//! [`EventLog`] serializes every append and read behind its own async
//! mutex, separate from any module state lock, so concurrent writers never
//! interleave partial lines. Reads are tolerant: a line that fails to
//! parse (for example one truncated by a crash mid-write) is skipped.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use vitals_core::{Clock, DisplayZone};

use crate::entry::{LogEntry, LogLevel};

/// Default number of entries returned to dashboards.
pub const DEFAULT_RECENT_LOGS: usize = 80;

/// Errors raised by [`EventLog`] I/O.
#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Event log I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Event could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable operational event log shared by every component.
pub struct EventLog {
    path: PathBuf,
    zone: DisplayZone,
    clock: Arc<dyn Clock>,
    /// Serializes file access; guards no data of its own.
    io_lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, zone: DisplayZone, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            zone,
            clock,
            io_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub async fn append(
        &self,
        level: LogLevel,
        msg: impl Into<String>,
    ) -> Result<LogEntry, EventLogError> {
        let entry = LogEntry {
            time: self.zone.format(self.clock.now()),
            level,
            msg: msg.into(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.io_lock.lock().await;
        self.ensure_parent().await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(entry)
    }

    /// Best-effort append that also mirrors the event to `tracing`.
    ///
    /// A failed write is reported through `tracing` only; callers never
    /// see it.
    pub async fn record(&self, level: LogLevel, msg: impl Into<String>) {
        let msg = msg.into();
        match level {
            LogLevel::Error => tracing::error!(event = %msg, "Event recorded"),
            LogLevel::Warn => tracing::warn!(event = %msg, "Event recorded"),
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(severity = %level, event = %msg, "Event recorded")
            }
        }

        if let Err(e) = self.append(level, msg).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to append to event log");
        }
    }

    /// Up to `limit` well-formed entries, newest first.
    ///
    /// A missing file is an empty log.
    pub async fn read_recent(&self, limit: usize) -> Result<Vec<LogEntry>, EventLogError> {
        let bytes = {
            let _guard = self.io_lock.lock().await;
            match fs::read(&self.path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            }
        };

        let mut entries: Vec<LogEntry> = bytes
            .split(|b| *b == b'\n')
            .filter_map(LogEntry::parse_bytes)
            .collect();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Raw file contents, creating an empty log first if none exists.
    pub async fn read_raw(&self) -> Result<Vec<u8>, EventLogError> {
        let _guard = self.io_lock.lock().await;
        self.ensure_parent().await?;
        // Touch the file so the download path always has something to serve.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        Ok(fs::read(&self.path).await?)
    }

    /// Drop every entry. Used by an explicit system reset only.
    pub async fn truncate(&self) -> Result<(), EventLogError> {
        let _guard = self.io_lock.lock().await;
        match OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_parent(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).await,
            _ => Ok(()),
        }
    }
}
