//! Corruption recovery tests for the intake_cli binary.
//!
//! These tests verify the system can handle:
//! - Corrupted goal state files
//! - Corrupted WAL files
//! - Missing files
//! - Partial writes

use assert_cmd::Command;
use std::fs;
use std::io::Write as IoWrite;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("halflife"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_goal_file_degrades_to_no_goals() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();

    // Write corrupted goal file
    let goals_path = data_dir.join("wal/goals.json");
    fs::write(&goals_path, "{ invalid json }}}}").expect("Failed to write corrupted goals");

    // Status degrades to the default empty state instead of failing
    cli()
        .arg("goal")
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("No goals set"));
}

#[test]
fn test_goal_set_recovers_corrupted_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    let goals_path = data_dir.join("wal/goals.json");
    fs::write(&goals_path, "corrupted").unwrap();

    // Setting a goal rewrites the file from the default state
    cli()
        .arg("goal")
        .arg("set")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--type")
        .arg("daily_limit")
        .arg("--target-value")
        .arg("10")
        .assert()
        .success();

    // Goal file should now be valid JSON
    let contents = fs::read_to_string(&goals_path).expect("Goals file should exist");
    let parsed: Result<serde_json::Value, _> = serde_json::from_str(&contents);
    assert!(parsed.is_ok(), "Goals file should be valid JSON");

    // Second run still succeeds (no manual recovery necessary)
    cli()
        .arg("goal")
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("daily_limit"));
}

#[test]
fn test_corrupted_wal_lines_ignored_during_read() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();

    // Write corrupted WAL file (invalid JSON lines)
    let wal_path = data_dir.join("wal/intake_events.wal");
    fs::write(&wal_path, "{ invalid json }\n{ more invalid }")
        .expect("Failed to write corrupted WAL");

    // Status still works (corrupted lines are logged as warnings)
    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_valid_events_survive_corrupt_neighbors() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // One good event through the CLI
    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--amount")
        .arg("4")
        .assert()
        .success();

    // Inject garbage between writes
    let wal_path = data_dir.join("wal/intake_events.wal");
    {
        let mut file = fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
        writeln!(file, "not even json").unwrap();
    }

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--amount")
        .arg("2")
        .assert()
        .success();

    // Both valid events are counted, the garbage line is skipped
    let output = cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stats: serde_json::Value = serde_json::from_slice(&output).expect("Invalid JSON");
    assert_eq!(stats["entries_in_window"], 2);
}

#[test]
fn test_partial_wal_line() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // Create a WAL file with a partial last line (simulating crash during write)
    fs::create_dir_all(data_dir.join("wal")).unwrap();
    let wal_path = data_dir.join("wal/intake_events.wal");

    let mut file = fs::File::create(&wal_path).unwrap();
    // Write valid line
    writeln!(
        file,
        r#"{{"id":"00000000-0000-0000-0000-000000000000","amount_mg":4.0,"taken_at":"{}"}}"#,
        chrono::Utc::now().to_rfc3339()
    )
    .unwrap();
    // Write partial line (no newline)
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    // Logging appends cleanly after the partial line
    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--amount")
        .arg("2")
        .assert()
        .success();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_empty_wal_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(data_dir.join("wal")).unwrap();
    fs::write(data_dir.join("wal/intake_events.wal"), "").unwrap();

    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_missing_csv_archive() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // No CSV, no WAL: every read command still works on an empty history
    cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    cli()
        .arg("costs")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    cli()
        .arg("usage")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}

#[test]
fn test_corrupt_csv_rows_skipped() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(&data_dir).unwrap();
    let csv_path = data_dir.join("events.csv");

    // One parseable row, one with a mangled UUID and one with a bad date
    let taken_at = chrono::Utc::now().to_rfc3339();
    fs::write(
        &csv_path,
        format!(
            "id,amount_mg,taken_at,kind,cost,note\n\
             11111111-1111-1111-1111-111111111111,4.0,{},vape,0.5,\n\
             not-a-uuid,2.0,{},vape,,\n\
             22222222-2222-2222-2222-222222222222,2.0,last tuesday,,,\n",
            taken_at, taken_at
        ),
    )
    .unwrap();

    let output = cli()
        .arg("status")
        .arg("--data-dir")
        .arg(&data_dir)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stats: serde_json::Value = serde_json::from_slice(&output).expect("Invalid JSON");
    assert_eq!(stats["entries_in_window"], 1);
}

#[test]
fn test_rollup_after_corruption() {
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

    // Garbage in the WAL does not block archival of the valid events
    let wal_path = data_dir.join("wal/intake_events.wal");
    {
        let mut file = fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
        writeln!(file, "{{ broken").unwrap();
    }

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicates::str::contains("Rolled up 1 events"));

    assert!(data_dir.join("events.csv").exists());
}
