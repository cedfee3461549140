//! In-memory module state guarded by a single fleet-wide lock.
//!
//! [`StateStore`] owns one [`ModuleState`] per configured module. All
//! access goes through closures that run while the lock is held, so no
//! caller can keep a guard across an `.await` on unrelated I/O and every
//! snapshot is a consistent point-in-time view.

use std::collections::BTreeMap;
use std::ops::Index;
use std::path::PathBuf;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tokio::sync::RwLock;
use vitals_core::{History, ModuleDescriptor, Reading, Status};

// ---------------------------------------------------------------------------
// ModuleState
// ---------------------------------------------------------------------------

/// Mutable record for one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleState {
    pub value: Option<Reading>,
    pub status: Status,
    /// Human-readable time of the last successful save, or of the record
    /// restored by recovery.
    pub last_checkpoint_time: Option<String>,
    /// Epoch seconds of the last successful save. Drives scheduling and is
    /// only ever moved forward by the checkpoint store.
    pub last_checkpoint_epoch: f64,
    pub history: History,
    /// True only while the module is inside a failure episode.
    pub failed: bool,
    /// Samples produced since startup or the last reset.
    pub sequence: u64,
    pub last_value_time: Option<String>,
}

impl ModuleState {
    /// Store a freshly generated reading and return the new sequence number.
    pub fn record_sample(&mut self, reading: Reading, time: String) -> u64 {
        self.sequence += 1;
        self.value = Some(reading);
        self.history.push(reading);
        self.last_value_time = Some(time);
        self.sequence
    }

    pub fn mark_failed(&mut self) {
        self.failed = true;
        self.status = Status::Failed;
    }

    /// Record a completed save. Returns `false` when a later save already
    /// landed, in which case the bookkeeping is left untouched.
    pub fn advance_checkpoint(&mut self, time: String, epoch: f64) -> bool {
        if epoch < self.last_checkpoint_epoch {
            return false;
        }
        self.last_checkpoint_epoch = epoch;
        self.last_checkpoint_time = Some(time);
        true
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Read-only view of one module, as handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSnapshot {
    pub icon: String,
    pub value: Option<Reading>,
    pub unit: String,
    pub status: Status,
    pub last_checkpoint: Option<String>,
    #[serde(rename = "seq")]
    pub sequence: u64,
    pub last_value_time: Option<String>,
    pub history_len: usize,
    pub failed: bool,
    pub checkpoint_interval_secs: u64,
    pub checkpoint_file: PathBuf,
}

/// Per-module snapshots keyed by name, in configured fleet order.
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleSnapshots(Vec<(String, ModuleSnapshot)>);

impl ModuleSnapshots {
    pub fn get(&self, name: &str) -> Option<&ModuleSnapshot> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ModuleSnapshot> {
        self.0.iter().map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&str> for ModuleSnapshots {
    type Output = ModuleSnapshot;

    /// Panics if no module has this name, like map indexing.
    fn index(&self, name: &str) -> &ModuleSnapshot {
        match self.get(name) {
            Some(module) => module,
            None => panic!("no module named {name:?} in snapshot"),
        }
    }
}

impl<'a> IntoIterator for &'a ModuleSnapshots {
    type Item = &'a (String, ModuleSnapshot);
    type IntoIter = std::slice::Iter<'a, (String, ModuleSnapshot)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, ModuleSnapshot)> for ModuleSnapshots {
    fn from_iter<I: IntoIterator<Item = (String, ModuleSnapshot)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ModuleSnapshots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, module) in &self.0 {
            map.serialize_entry(name, module)?;
        }
        map.end()
    }
}

/// Point-in-time view of the whole fleet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub time: String,
    pub modules: ModuleSnapshots,
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// The single guarded structure holding every module's state.
#[derive(Debug)]
pub struct StateStore {
    modules: RwLock<BTreeMap<String, ModuleState>>,
}

impl StateStore {
    /// Create startup-default state for each descriptor.
    pub fn new(descriptors: &[ModuleDescriptor]) -> Self {
        let modules = descriptors
            .iter()
            .map(|d| (d.name.clone(), ModuleState::default()))
            .collect();
        Self {
            modules: RwLock::new(modules),
        }
    }

    /// Mutate one module under the write lock. `None` if the name is unknown.
    pub async fn update<R>(&self, name: &str, f: impl FnOnce(&mut ModuleState) -> R) -> Option<R> {
        let mut modules = self.modules.write().await;
        modules.get_mut(name).map(f)
    }

    /// Read one module under the read lock. `None` if the name is unknown.
    pub async fn inspect<R>(&self, name: &str, f: impl FnOnce(&ModuleState) -> R) -> Option<R> {
        let modules = self.modules.read().await;
        modules.get(name).map(f)
    }

    /// Copy of one module's state.
    pub async fn get(&self, name: &str) -> Option<ModuleState> {
        self.inspect(name, ModuleState::clone).await
    }

    /// Exclusive access to every module at once.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, BTreeMap<String, ModuleState>> {
        self.modules.write().await
    }

    /// Build a consistent snapshot of the fleet in one read-lock section.
    pub async fn snapshot(&self, descriptors: &[ModuleDescriptor], time: String) -> FleetSnapshot {
        let modules = self.modules.read().await;
        let modules = descriptors
            .iter()
            .filter_map(|d| {
                modules.get(&d.name).map(|s| {
                    (
                        d.name.clone(),
                        ModuleSnapshot {
                            icon: d.icon.clone(),
                            value: s.value,
                            unit: d.unit.clone(),
                            status: s.status,
                            last_checkpoint: s.last_checkpoint_time.clone(),
                            sequence: s.sequence,
                            last_value_time: s.last_value_time.clone(),
                            history_len: s.history.len(),
                            failed: s.failed,
                            checkpoint_interval_secs: d.checkpoint_interval_secs,
                            checkpoint_file: d.checkpoint_file.clone(),
                        },
                    )
                })
            })
            .collect();
        FleetSnapshot { time, modules }
    }
}
