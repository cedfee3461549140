/// All timestamps are UTC; conversion to a display zone happens at the edge.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Seconds since the Unix epoch with millisecond resolution.
///
/// Used for checkpoint scheduling, where only differences matter.
pub fn epoch_secs(ts: Timestamp) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}
