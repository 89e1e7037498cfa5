//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::path::Path;
use std::process::Command;

use chrono::{Duration, Utc};
use pomodoro_core::{Database, SessionStore};
use tempfile::TempDir;

/// Run a CLI command against `data_dir` and return (code, stdout, stderr).
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomodoro"))
        .args(args)
        .env("POMODORO_DATA_DIR", data_dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn open_db(dir: &TempDir) -> Database {
    Database::open_at(dir.path().join("pomodoro.db")).expect("open test database")
}

fn parse_json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout.trim()).expect("stdout is a single JSON document")
}

#[test]
fn test_status_without_session() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["status"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No active session"));

    let (code, stdout, _) = run_cli(dir.path(), &["status", "--json"]);
    assert_eq!(code, 0);
    let value = parse_json(&stdout);
    assert_eq!(value["running"], false);
    assert!(value["session"].is_null());
}

#[test]
fn test_status_reports_open_session() {
    let dir = TempDir::new().unwrap();
    let id = open_db(&dir).create("Write report", 1500).unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &["status", "-j"]);
    assert_eq!(code, 0);
    let value = parse_json(&stdout);
    assert_eq!(value["running"], true);
    assert_eq!(value["session"]["id"], id);
    assert_eq!(value["session"]["task"], "Write report");
}

#[test]
fn test_stop_without_session_fails() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["stop"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("No active session"));
}

#[test]
fn test_stop_closes_open_session() {
    let dir = TempDir::new().unwrap();
    let id = open_db(&dir).create("Review PR", 1500).unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &["stop", "--json"]);
    assert_eq!(code, 0);
    let value = parse_json(&stdout);
    assert_eq!(value["status"], "stopped");
    assert_eq!(value["session_id"], id);
    assert_eq!(value["task"], "Review PR");

    let record = open_db(&dir).get(id).unwrap().unwrap();
    assert!(record.completed_at.is_some());

    let (code, _, _) = run_cli(dir.path(), &["stop"]);
    assert_eq!(code, 1, "second stop has nothing to close");
}

#[test]
fn test_start_refused_while_session_open() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.create("Already running", 1500).unwrap();

    let (code, _, stderr) = run_cli(dir.path(), &["start", "-t", "Another"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already running"));
    assert!(stderr.contains("Already running"));

    let all = db.history(1, 100).unwrap();
    assert_eq!(all.len(), 1, "no second record was created");
}

#[test]
fn test_start_rejects_zero_work() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["start", "-t", "Nap", "-w", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("work"));
    assert!(open_db(&dir).history(1, 100).unwrap().is_empty());
}

#[test]
fn test_start_requires_task() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["start"]);
    assert_ne!(code, 0);
}

#[test]
fn test_history_json() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let now = Utc::now();
    db.insert_at("Old", 1500, now - Duration::days(10), Some(now - Duration::days(10)))
        .unwrap();
    db.insert_at("Recent", 1500, now - Duration::hours(2), None)
        .unwrap();
    db.insert_at("Newest", 1500, now - Duration::hours(1), Some(now))
        .unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &["history", "--json"]);
    assert_eq!(code, 0);
    let value = parse_json(&stdout);
    let rows = value.as_array().unwrap();
    let tasks: Vec<&str> = rows.iter().map(|r| r["task"].as_str().unwrap()).collect();
    assert_eq!(tasks, ["Newest", "Recent"]);

    let (code, stdout, _) = run_cli(dir.path(), &["history", "-d", "30", "-l", "1", "-j"]);
    assert_eq!(code, 0);
    assert_eq!(parse_json(&stdout).as_array().unwrap().len(), 1);
}

#[test]
fn test_history_with_huge_lookback() {
    let dir = TempDir::new().unwrap();
    open_db(&dir).create("Long view", 1500).unwrap();

    let (code, stdout, stderr) = run_cli(dir.path(), &["history", "-d", "4294967295", "-j"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(parse_json(&stdout).as_array().unwrap().len(), 1);
}

#[test]
fn test_history_empty() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["history"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("No sessions found"));
}

#[test]
fn test_stats_json() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    let now = Utc::now();
    for i in 0..10 {
        let started = now - Duration::hours(i + 1);
        let completed = (i < 7).then_some(started + Duration::minutes(25));
        db.insert_at("Deep work", 1500, started, completed).unwrap();
    }

    let (code, stdout, _) = run_cli(dir.path(), &["stats", "--period", "week", "--json"]);
    assert_eq!(code, 0);
    let value = parse_json(&stdout);
    assert_eq!(value["period"], "week");
    assert_eq!(value["total_count"], 10);
    assert_eq!(value["completed_count"], 7);
    assert_eq!(value["incomplete_count"], 3);
    assert_eq!(value["completion_rate"], 70.0);
    assert_eq!(value["focus_minutes"], 175);
    assert_eq!(value["counts_by_task"][0]["task"], "Deep work");
    assert_eq!(value["counts_by_task"][0]["count"], 10);
}

#[test]
fn test_stats_text() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["stats", "-p", "day"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Total Sessions: 0"));
    assert!(stdout.contains("Completion Rate: 0.0%"));
}

#[test]
fn test_stats_rejects_unknown_period() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(dir.path(), &["stats", "-p", "decade"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("decade"));
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "25");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "timer.work_minutes", "50"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"]);
    assert_eq!(stdout.trim(), "50");
    assert!(dir.path().join("config.toml").exists());

    let (code, _, _) = run_cli(dir.path(), &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);

    let (code, _, _) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "timer.work_minutes"]);
    assert_eq!(stdout.trim(), "25");
}
