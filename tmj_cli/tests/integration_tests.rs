//! Integration tests for the tmjguide binary.
//!
//! These tests verify end-to-end behavior including:
//! - Catalog listing and exercise details
//! - Running a full muted session without pauses
//! - Daily session counting across runs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("tmjguide"))
}

/// Start one muted session with Enter and run it with no waits
fn run_quick_session(data_dir: &std::path::Path) -> assert_cmd::assert::Assert {
    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(data_dir)
        .arg("--mute")
        .arg("--once")
        .arg("--time-scale")
        .arg("0")
        .write_stdin("\n")
        .assert()
}

/// Today's date as keyed by the session tally
fn today_key() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Guided TMJ exercise sessions with spoken instructions",
        ));
}

#[test]
fn test_list_shows_all_exercises_in_order() {
    cli()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Deep Breathing with Tongue Position (6 breaths)"))
        .stdout(predicate::str::contains("4. Fist-Resistance Jaw Opening (6 × 6s hold)"))
        .stdout(predicate::str::contains("5. Side Jaw Pressure Exercise (6 × 6s hold per side)"))
        .stdout(predicate::str::contains("6. Chin Retraction Exercise"));
}

#[test]
fn test_show_exercise_details() {
    cli()
        .arg("show")
        .arg("4")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chin Resistance Exercise"))
        .stdout(predicate::str::contains("  1. Make a fist"))
        .stdout(predicate::str::contains("Hold:         Hold this position. Avoid clicking."));
}

#[test]
fn test_show_unknown_exercise_fails() {
    cli().arg("show").arg("9").assert().failure();
}

#[test]
fn test_today_without_data() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("today")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions today: 0/6"))
        .stdout(predicate::str::contains("6 more sessions recommended today"));
}

#[test]
fn test_full_session_completes() {
    let temp_dir = setup_test_dir();

    run_quick_session(temp_dir.path())
        .success()
        .stdout(predicate::str::contains("1/6  Tongue-to-Roof Breathing"))
        .stdout(predicate::str::contains("6/6  Double Chin Neck Stretch"))
        .stdout(predicate::str::contains("Rep 6/6 (right side)"))
        .stdout(predicate::str::contains("Switching to the right side"))
        .stdout(predicate::str::contains("SESSION COMPLETE"))
        .stdout(predicate::str::contains("Sessions today: 1/6"));

    assert!(temp_dir.path().join("store.json").exists());
}

#[test]
fn test_sessions_counted_per_day() {
    let temp_dir = setup_test_dir();

    run_quick_session(temp_dir.path()).success();
    run_quick_session(temp_dir.path())
        .success()
        .stdout(predicate::str::contains("Sessions today: 2/6"));

    cli()
        .arg("today")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions today: 2/6"))
        .stdout(predicate::str::contains("4 more sessions recommended today"));
}

#[test]
fn test_existing_count_is_continued() {
    let temp_dir = setup_test_dir();
    let key = today_key();
    let store = serde_json::json!({ "tmj-sessions": { key: 5 } });
    fs::write(temp_dir.path().join("store.json"), store.to_string()).unwrap();

    run_quick_session(temp_dir.path())
        .success()
        .stdout(predicate::str::contains("Sessions today: 6/6"))
        .stdout(predicate::str::contains("You've completed your daily goal!"));
}

#[test]
fn test_corrupted_store_is_recovered() {
    let temp_dir = setup_test_dir();
    let store_path = temp_dir.path().join("store.json");
    fs::write(&store_path, "{ invalid json }}}}").unwrap();

    cli()
        .arg("today")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Sessions today: 0/6"));

    run_quick_session(temp_dir.path())
        .success()
        .stdout(predicate::str::contains("Sessions today: 1/6"));

    let contents = fs::read_to_string(&store_path).unwrap();
    let store: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert!(store["tmj-sessions"].is_object());
}

#[test]
fn test_corrupted_tally_value_is_recovered() {
    let temp_dir = setup_test_dir();
    fs::write(
        temp_dir.path().join("store.json"),
        r#"{"tmj-sessions": "not a map"}"#,
    )
    .unwrap();

    run_quick_session(temp_dir.path())
        .success()
        .stdout(predicate::str::contains("Sessions today: 1/6"));
}

#[test]
fn test_quit_from_stdin_exits_cleanly() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--mute")
        .arg("--time-scale")
        .arg("0")
        .write_stdin("q\n")
        .assert()
        .success();
}

#[test]
fn test_session_waits_for_enter() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--mute")
        .arg("--time-scale")
        .arg("0")
        .assert()
        .success()
        .stdout(predicate::str::contains("Press Enter to start"))
        .stdout(predicate::str::contains("SESSION COMPLETE").not());

    assert!(!temp_dir.path().join("store.json").exists());
}

#[test]
fn test_out_of_range_time_scale_is_rejected() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("start")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .arg("--mute")
        .arg("--time-scale")
        .arg("1e300")
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("time_scale"));
}
