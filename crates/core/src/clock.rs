//! Wall-clock sources and human-readable timestamp rendering.
//!
//! Workers and the checkpoint store read time through [`Clock`] so tests
//! can drive scheduling with a [`ManualClock`] instead of sleeping.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Source of the current UTC time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to. Millisecond resolution.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now_ms: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, to: Timestamp) {
        self.now_ms.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        DateTime::from_timestamp_millis(self.now_ms.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Fixed UTC offset used to render timestamps for people.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayZone {
    offset: FixedOffset,
}

impl Default for DisplayZone {
    fn default() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }
}

impl DisplayZone {
    /// Build a zone from an offset east of UTC, in minutes.
    pub fn from_offset_minutes(minutes: i32) -> Result<Self, CoreError> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(|offset| Self { offset })
            .ok_or_else(|| CoreError::Validation(format!("UTC offset {minutes}m is out of range")))
    }

    /// `2026-01-31 18:04:05 +05:30`
    pub fn format(&self, ts: Timestamp) -> String {
        ts.with_timezone(&self.offset)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string()
    }
}
