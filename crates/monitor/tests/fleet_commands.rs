//! Façade commands, reset semantics and concurrent access.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::TimeZone;
use tempfile::TempDir;
use vitals_core::{Clock, ManualClock, Reading, Status, HISTORY_CAPACITY};
use vitals_events::LogLevel;
use vitals_monitor::{Fleet, ModuleState, MonitorConfig, MonitorError, RecoveryOutcome, Tick};

fn manual_fleet() -> (TempDir, Arc<ManualClock>, Fleet) {
    let dir = TempDir::new().unwrap();
    let mut config = MonitorConfig::new(dir.path());
    config.failure_probability = 0.0;
    config.stagger_first_checkpoint = false;
    let start = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let fleet = Fleet::with_clock(config, Arc::clone(&clock) as Arc<dyn Clock>).unwrap();
    (dir, clock, fleet)
}

fn assert_startup_default(name: &str, state: &ModuleState) {
    assert_eq!(state.value, None, "{name}");
    assert_eq!(state.status, Status::Active, "{name}");
    assert!(state.history.is_empty(), "{name}");
    assert_eq!(state.sequence, 0, "{name}");
    assert!(!state.failed, "{name}");
    assert_eq!(state.last_checkpoint_time, None, "{name}");
    assert_eq!(state.last_value_time, None, "{name}");
}

// ---------------------------------------------------------------------------
// Test: commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_module_is_rejected() {
    let (_dir, _clock, fleet) = manual_fleet();
    assert_matches!(
        fleet.trigger_failure("Glucose").await,
        Err(MonitorError::UnknownModule(name)) if name == "Glucose"
    );
    assert_matches!(
        fleet.trigger_recovery("Glucose").await,
        Err(MonitorError::UnknownModule(_))
    );
    assert_matches!(fleet.history("Glucose").await, Err(MonitorError::UnknownModule(_)));
    assert_matches!(fleet.worker("Glucose"), Err(MonitorError::UnknownModule(_)));
}

#[tokio::test]
async fn repeated_recovery_without_checkpoint_is_idempotent() {
    let (_dir, _clock, fleet) = manual_fleet();

    for _ in 0..2 {
        let outcome = fleet.trigger_recovery("Temperature").await.unwrap();
        assert_eq!(outcome, RecoveryOutcome::NoCheckpoint);
        let temp = fleet.context().state.get("Temperature").await.unwrap();
        assert_eq!(temp.status, Status::NoCheckpoint);
        assert!(!temp.failed);
        assert_eq!(temp.value, None);
    }

    let warnings = fleet
        .recent_logs(80)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.level == LogLevel::Warn)
        .count();
    assert_eq!(warnings, 2);
}

#[tokio::test]
async fn manual_recovery_bypasses_worker() {
    let (_dir, clock, fleet) = manual_fleet();
    let module = fleet.context().module("Oxygen").unwrap().clone();
    clock.advance(Duration::from_secs(3));
    let saved = fleet
        .context()
        .checkpoints
        .save(&module, Reading::Integer(94))
        .await
        .unwrap();

    fleet.trigger_failure("Oxygen").await.unwrap();
    let outcome = fleet.trigger_recovery("Oxygen").await.unwrap();
    assert_eq!(outcome, RecoveryOutcome::Restored(saved.clone()));

    let oxy = fleet.snapshot().await.modules["Oxygen"].clone();
    assert_eq!(oxy.value, Some(Reading::Integer(94)));
    assert_eq!(oxy.status, Status::Recovered);
    assert!(!oxy.failed);
    assert_eq!(oxy.last_checkpoint, Some(saved.time));
}

// ---------------------------------------------------------------------------
// Test: reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_restores_defaults_and_clears_disk() {
    let (_dir, clock, fleet) = manual_fleet();

    let mut workers: Vec<_> = ["Heart Rate", "Temperature", "Oxygen"]
        .iter()
        .map(|name| fleet.worker(name).unwrap())
        .collect();
    for worker in &workers {
        worker.prime().await;
    }
    for _ in 0..10 {
        clock.advance(Duration::from_secs(1));
        for worker in workers.iter_mut() {
            if let Tick::Sampled {
                checkpoint: Some(handle),
                ..
            } = worker.tick().await
            {
                handle.await.unwrap();
            }
        }
    }
    fleet.trigger_failure("Oxygen").await.unwrap();
    for module in fleet.modules() {
        assert!(module.checkpoint_file.exists(), "{} saved", module.name);
    }

    let removed = fleet.reset_all().await;
    assert_eq!(removed, 3);

    for module in fleet.modules() {
        assert!(!module.checkpoint_file.exists());
        let state = fleet.context().state.get(&module.name).await.unwrap();
        assert_startup_default(&module.name, &state);
    }

    let logs = fleet.recent_logs(80).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].level, LogLevel::Info);
    assert_eq!(logs[0].msg, "System reset: checkpoints and logs cleared");
}

#[tokio::test]
async fn reset_with_nothing_on_disk() {
    let (_dir, _clock, fleet) = manual_fleet();
    assert_eq!(fleet.reset_all().await, 0);
    for module in fleet.modules() {
        let state = fleet.context().state.get(&module.name).await.unwrap();
        assert_startup_default(&module.name, &state);
    }
}

// ---------------------------------------------------------------------------
// Test: queries
// ---------------------------------------------------------------------------

#[tokio::test]
async fn snapshot_serializes_for_presentation() {
    let (_dir, clock, fleet) = manual_fleet();
    let mut worker = fleet.worker("Heart Rate").unwrap();
    worker.prime().await;
    clock.advance(Duration::from_secs(1));
    worker.tick().await;

    let json = serde_json::to_value(fleet.snapshot().await).unwrap();
    assert_eq!(json["time"], "2026-03-01 12:00:01 +00:00");
    let heart = &json["modules"]["Heart Rate"];
    assert_eq!(heart["unit"], "bpm");
    assert_eq!(heart["status"], "Active");
    assert_eq!(heart["seq"], 1);
    assert_eq!(heart["history_len"], 1);
    assert!(heart["value"].is_i64());
    assert!(heart["last_checkpoint"].is_null());
    assert!(heart["checkpoint_file"]
        .as_str()
        .unwrap()
        .ends_with("heart.json"));
    assert_eq!(json["modules"]["Oxygen"]["seq"], 0);
}

#[tokio::test]
async fn history_and_log_download() {
    let (_dir, clock, fleet) = manual_fleet();
    let mut worker = fleet.worker("Temperature").unwrap();
    worker.prime().await;

    let mut produced = Vec::new();
    for _ in 0..4 {
        clock.advance(Duration::from_secs(1));
        if let Tick::Sampled { reading, .. } = worker.tick().await {
            produced.push(reading);
        }
    }
    assert_eq!(fleet.history("Temperature").await.unwrap(), produced);

    assert!(fleet.download_log().await.unwrap().is_empty());
    fleet.trigger_failure("Temperature").await.unwrap();
    let raw = String::from_utf8(fleet.download_log().await.unwrap()).unwrap();
    assert_eq!(raw.lines().count(), 1);
    assert!(raw.contains("Temperature: manual failure triggered"));
}

// ---------------------------------------------------------------------------
// Test: live fleet under concurrent commands
// ---------------------------------------------------------------------------

/// Failure commands racing real worker ticks never break the history
/// invariant and never leave a module stuck failed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_failures_against_live_workers() {
    let dir = TempDir::new().unwrap();
    let mut config = MonitorConfig::new(dir.path());
    config.failure_probability = 0.0;
    config.sample_period = Duration::from_millis(5);
    let fleet = Arc::new(Fleet::new(config).unwrap());
    fleet.start().await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let fleet = Arc::clone(&fleet);
        handles.push(tokio::spawn(async move {
            fleet.trigger_failure("Oxygen").await.unwrap();
            tokio::time::sleep(Duration::from_millis(i % 7)).await;
            let snap = fleet.snapshot().await;
            for module in snap.modules.values() {
                assert!(module.history_len <= HISTORY_CAPACITY);
                assert_eq!(
                    module.history_len as u64,
                    module.sequence.min(HISTORY_CAPACITY as u64)
                );
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every failure is followed by a recovery on a later tick.
    let mut healed = false;
    for _ in 0..200 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if !fleet.snapshot().await.modules["Oxygen"].failed {
            healed = true;
            break;
        }
    }
    assert!(healed, "Oxygen stayed failed");

    let snap = fleet.snapshot().await;
    assert!(snap.modules["Heart Rate"].sequence > 0);
    assert!(snap.modules["Oxygen"].sequence > 0);

    fleet.shutdown().await;
}

/// Starting twice spawns no extra workers, and shutdown stops sampling.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn start_is_idempotent_and_shutdown_stops_sampling() {
    let dir = TempDir::new().unwrap();
    let mut config = MonitorConfig::new(dir.path());
    config.failure_probability = 0.0;
    config.sample_period = Duration::from_millis(5);
    let fleet = Fleet::new(config).unwrap();

    fleet.start().await;
    fleet.start().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    fleet.shutdown().await;

    let after_stop = fleet.snapshot().await.modules["Heart Rate"].sequence;
    assert!(after_stop > 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(fleet.snapshot().await.modules["Heart Rate"].sequence, after_stop);
}

/// A fleet started again after shutdown keeps sampling on fresh workers.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_after_shutdown_resumes_sampling() {
    let dir = TempDir::new().unwrap();
    let mut config = MonitorConfig::new(dir.path());
    config.failure_probability = 0.0;
    config.sample_period = Duration::from_millis(5);
    let fleet = Fleet::new(config).unwrap();

    fleet.start().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    fleet.shutdown().await;
    let stopped_at = fleet.snapshot().await.modules["Heart Rate"].sequence;

    fleet.start().await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let resumed = fleet.snapshot().await.modules["Heart Rate"].sequence;
    assert!(
        resumed >= stopped_at + 5,
        "restarted fleet sampled only {} times",
        resumed - stopped_at
    );

    fleet.shutdown().await;
    let after_second_stop = fleet.snapshot().await.modules["Heart Rate"].sequence;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(
        fleet.snapshot().await.modules["Heart Rate"].sequence,
        after_second_stop
    );
}
