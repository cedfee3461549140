//! One line of the durable event log.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event severity as written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Success => "SUCCESS",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event record, serialized as one JSON object per line:
/// `{"time": "...", "level": "SUCCESS", "msg": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Human-readable timestamp in the configured display zone.
    pub time: String,
    pub level: LogLevel,
    pub msg: String,
}

impl LogEntry {
    /// Parse one log line. Blank, truncated or foreign lines yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        serde_json::from_str(line).ok()
    }

    /// Parse one raw line. Invalid UTF-8 counts as malformed.
    pub fn parse_bytes(line: &[u8]) -> Option<Self> {
        std::str::from_utf8(line).ok().and_then(Self::parse_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let entry =
            LogEntry::parse_line(r#"{"time":"2026-03-01 12:00:00 +00:00","level":"WARN","msg":"hi"}"#)
                .unwrap();
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.msg, "hi");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(LogEntry::parse_line("").is_none());
        assert!(LogEntry::parse_line(r#"{"time":"x","level":"INFO","ms"#).is_none());
        assert!(LogEntry::parse_line(r#"{"time":"x","level":"DEBUG","msg":"m"}"#).is_none());
        assert!(LogEntry::parse_line(r#"{"time":"x","msg":"no level"}"#).is_none());
        assert!(LogEntry::parse_line("plain text").is_none());
    }

    #[test]
    fn raw_lines_must_be_utf8() {
        assert!(LogEntry::parse_bytes(br#"{"time":"x","level":"INFO","msg":"ok"}"#).is_some());
        assert!(LogEntry::parse_bytes(b"{\"time\":\"x\",\"level\":\"INFO\",\"msg\":\"\xc3\"}").is_none());
    }

    #[test]
    fn level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Success).unwrap(), "\"SUCCESS\"");
    }
}
