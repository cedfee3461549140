//! Module status state machine values.
//!
//! `Active -> Checkpointing -> Active` is the normal cycle. Failure runs
//! `Failed -> Recovering -> {Recovered | No Checkpoint}` and returns to
//! `Active` on the next successful checkpoint. `Checkpoint Error` is
//! reported for a failed save and cleared by the next successful one.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Active")]
    Active,
    #[serde(rename = "Checkpointing")]
    Checkpointing,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Recovering")]
    Recovering,
    #[serde(rename = "Recovered")]
    Recovered,
    #[serde(rename = "No Checkpoint")]
    NoCheckpoint,
    #[serde(rename = "Checkpoint Error")]
    CheckpointError,
}

impl Status {
    /// Display label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Checkpointing => "Checkpointing",
            Status::Failed => "Failed",
            Status::Recovering => "Recovering",
            Status::Recovered => "Recovered",
            Status::NoCheckpoint => "No Checkpoint",
            Status::CheckpointError => "Checkpoint Error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_form_matches_label() {
        for status in [
            Status::Active,
            Status::Checkpointing,
            Status::Failed,
            Status::Recovering,
            Status::Recovered,
            Status::NoCheckpoint,
            Status::CheckpointError,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
