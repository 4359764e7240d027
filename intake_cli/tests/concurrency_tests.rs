//! Concurrency tests for the intake_cli binary.
//!
//! These tests verify that multiple processes can safely:
//! - Append to the WAL simultaneously (file locking)
//! - Read history while writers are active
//! - Roll up the WAL without corrupting in-flight writes

use assert_cmd::Command;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("halflife"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_sequential_logging_accumulates() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Log with slight delays (more realistic than thundering herd)
    for i in 0..5 {
        thread::sleep(Duration::from_millis(i * 5));
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--amount")
            .arg("2")
            .assert()
            .success();
    }

    // Verify all events were logged
    let wal_path = data_dir.join("wal/intake_events.wal");
    let wal_content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");

    let event_count = wal_content.lines().count();
    assert_eq!(event_count, 5, "Expected 5 events, got {}", event_count);
}

#[test]
fn test_reads_interleaved_with_writes() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--amount")
        .arg("4")
        .assert()
        .success();

    // Write more events with delays, reading between them
    for i in 0..3 {
        thread::sleep(Duration::from_millis(i * 10));
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--amount")
            .arg("2")
            .assert()
            .success();

        // Readers take a shared lock and can run at any time
        cli()
            .arg("status")
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    // Should have 4 total events (1 initial + 3 more)
    let wal_path = data_dir.join("wal/intake_events.wal");
    let wal_content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");
    assert_eq!(wal_content.lines().count(), 4);
}

#[test]
fn test_rollup_while_writing() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Create some initial events
    for _ in 0..3 {
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--amount")
            .arg("2")
            .assert()
            .success();
    }

    // Start rollup in background
    let data_dir_rollup = data_dir.clone();
    let rollup_handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        cli()
            .arg("rollup")
            .arg("--data-dir")
            .arg(&data_dir_rollup)
            .assert()
            .success();
    });

    // Write more events while rollup might be running
    for _ in 0..2 {
        cli()
            .arg("log")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--amount")
            .arg("2")
            .assert()
            .success();
        thread::sleep(Duration::from_millis(5));
    }

    rollup_handle.join().expect("Rollup thread panicked");

    // Verify CSV exists and has data
    let csv_path = data_dir.join("events.csv");
    assert!(csv_path.exists());

    // New events should still be in the WAL or successfully archived
    let wal_path = data_dir.join("wal/intake_events.wal");
    if wal_path.exists() {
        let wal_content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");
        assert!(wal_content.lines().count() >= 1);
    }
}

#[test]
fn test_no_wal_corruption_under_load() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Hammer the CLI with many concurrent writes
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                // Small stagger to reduce thundering herd
                thread::sleep(Duration::from_millis(i * 5));
                cli()
                    .arg("log")
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .arg("--amount")
                    .arg("2")
                    .timeout(Duration::from_secs(10))
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    // Give filesystem a moment to settle
    thread::sleep(Duration::from_millis(100));

    // Verify WAL is valid JSON-lines
    let wal_path = data_dir.join("wal/intake_events.wal");
    let wal_content = std::fs::read_to_string(&wal_path).expect("Failed to read WAL");

    let mut valid_count = 0;
    for line in wal_content.lines() {
        if line.is_empty() {
            continue;
        }
        let parsed: Result<serde_json::Value, _> = serde_json::from_str(line);
        assert!(parsed.is_ok(), "WAL contains invalid JSON line: {}", line);
        valid_count += 1;
    }

    assert_eq!(valid_count, 10, "Expected 10 valid events in WAL");
}

#[test]
fn test_goal_state_sequential_updates() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Each set rewrites goals.json through the atomic temp-file path
    for target in ["12", "10", "8"] {
        cli()
            .arg("goal")
            .arg("set")
            .arg("--data-dir")
            .arg(&data_dir)
            .arg("--type")
            .arg("daily_limit")
            .arg("--target-value")
            .arg(target)
            .timeout(Duration::from_secs(10))
            .assert()
            .success();
    }

    // Goal file should exist and be valid JSON with a single goal
    let goals_path = data_dir.join("wal/goals.json");
    assert!(goals_path.exists());

    let contents = std::fs::read_to_string(&goals_path).expect("Failed to read goals");
    let parsed: serde_json::Value =
        serde_json::from_str(&contents).expect("Goal file contains invalid JSON");
    assert_eq!(parsed["goals"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["goals"][0]["target_value"], 8.0);
}
