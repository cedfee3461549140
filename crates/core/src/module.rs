//! Static description of the monitored sensor fleet.
//!
//! Descriptors are built once at process start and never mutated; the
//! mutable side lives in the monitor crate's state store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::reading::ReadingRange;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default directory (relative to the data dir) holding checkpoint files.
pub const DEFAULT_CHECKPOINT_DIR: &str = "checkpoints";

/// Maximum length of a module name.
const MAX_NAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// One configured sensor. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    pub icon: String,
    pub unit: String,
    /// Seconds between checkpoint attempts.
    pub checkpoint_interval_secs: u64,
    /// Where this module's checkpoint record lives.
    pub checkpoint_file: PathBuf,
    pub range: ReadingRange,
}

impl ModuleDescriptor {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_module_name(&self.name)?;
        if self.checkpoint_interval_secs == 0 {
            return Err(CoreError::Validation(format!(
                "{}: checkpoint interval must be at least one second",
                self.name
            )));
        }
        if self.checkpoint_file.file_name().is_none() {
            return Err(CoreError::Validation(format!(
                "{}: checkpoint location must name a file",
                self.name
            )));
        }
        self.range.validate()
    }
}

/// The stock three-sensor fleet, with checkpoint files under `checkpoint_dir`.
pub fn default_fleet(checkpoint_dir: &Path) -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor {
            name: "Heart Rate".into(),
            icon: "❤️".into(),
            unit: "bpm".into(),
            checkpoint_interval_secs: 5,
            checkpoint_file: checkpoint_dir.join("heart.json"),
            range: ReadingRange::Integer { min: 60, max: 100 },
        },
        ModuleDescriptor {
            name: "Temperature".into(),
            icon: "🌡️".into(),
            unit: "°C".into(),
            checkpoint_interval_secs: 8,
            checkpoint_file: checkpoint_dir.join("temp.json"),
            range: ReadingRange::Decimal {
                min: 36.0,
                max: 37.5,
                precision: 1,
            },
        },
        ModuleDescriptor {
            name: "Oxygen".into(),
            icon: "🫁".into(),
            unit: "%".into(),
            checkpoint_interval_secs: 10,
            checkpoint_file: checkpoint_dir.join("oxy.json"),
            range: ReadingRange::Integer { min: 92, max: 100 },
        },
    ]
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a module name.
///
/// Rules:
/// - Must not be empty or whitespace only.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must not contain control characters.
pub fn validate_module_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Module name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Module name must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(CoreError::Validation(
            "Module name must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate a whole fleet: every descriptor, unique names, unique files.
pub fn validate_fleet(modules: &[ModuleDescriptor]) -> Result<(), CoreError> {
    if modules.is_empty() {
        return Err(CoreError::Validation(
            "At least one module must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    let mut files = HashSet::new();
    for module in modules {
        module.validate()?;
        if !names.insert(module.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "Duplicate module name: {}",
                module.name
            )));
        }
        if !files.insert(module.checkpoint_file.as_path()) {
            return Err(CoreError::Validation(format!(
                "{}: checkpoint file {} is shared with another module",
                module.name,
                module.checkpoint_file.display()
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_fleet_is_valid() {
        let fleet = default_fleet(Path::new("checkpoints"));
        assert_eq!(fleet.len(), 3);
        assert!(validate_fleet(&fleet).is_ok());
        assert_eq!(fleet[0].checkpoint_file, Path::new("checkpoints/heart.json"));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut fleet = default_fleet(Path::new("cp"));
        fleet[1].name = fleet[0].name.clone();
        assert_matches!(validate_fleet(&fleet), Err(CoreError::Validation(msg)) if msg.contains("Duplicate"));
    }

    #[test]
    fn shared_checkpoint_file_rejected() {
        let mut fleet = default_fleet(Path::new("cp"));
        fleet[2].checkpoint_file = fleet[0].checkpoint_file.clone();
        assert!(validate_fleet(&fleet).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let mut fleet = default_fleet(Path::new("cp"));
        fleet[0].checkpoint_interval_secs = 0;
        assert!(fleet[0].validate().is_err());
    }

    #[test]
    fn module_names() {
        assert!(validate_module_name("Heart Rate").is_ok());
        assert!(validate_module_name("   ").is_err());
        assert!(validate_module_name("bad\nname").is_err());
        assert!(validate_module_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn empty_fleet_rejected() {
        assert!(validate_fleet(&[]).is_err());
    }
}
