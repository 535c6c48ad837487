//! E2E tests for `rec`, `show` and `days`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn am_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("activemonitor"));
    cmd.env("HOME", home);
    cmd.env_remove("XDG_CONFIG_HOME");
    cmd.env("DB_DIR", home.join("shards"));
    cmd.env("ACTIVEMONITOR_LOG", "error");
    cmd.env("ACTIVEMONITOR_SUPPRESS", "");
    cmd.env("FORMAT", "text");
    for var in ["NOW", "DB_PATH", "ACTIVEMONITOR_INTERVAL", "ACTIVEMONITOR_DAY_OFFSET"] {
        cmd.env_remove(var);
    }
    cmd
}

fn rec_at(home: &Path, now: &str) {
    am_cmd(home).env("NOW", now).arg("rec").assert().success();
}

#[test]
fn rec_writes_into_previous_day_before_boundary() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .env("NOW", "2024-03-02 04:59:59")
        .arg("rec")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("recorded 2024-03-02 04:59:59"));

    assert!(home.path().join("shards/20240301.db").is_file());
    assert!(!home.path().join("shards/20240302.db").exists());
}

#[test]
fn rec_twice_in_one_second_is_benign() {
    let home = TempDir::new().expect("tempdir");
    rec_at(home.path(), "2024-03-01 12:00:00");
    am_cmd(home.path())
        .env("NOW", "2024-03-01 12:00:00")
        .args(["rec", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"already_recorded\""));
}

#[test]
fn rec_is_suppressed_while_matching_process_runs() {
    if !sysinfo::IS_SUPPORTED_SYSTEM {
        return;
    }
    let home = TempDir::new().expect("tempdir");
    // The `activemonitor` process doing the recording matches its own name.
    am_cmd(home.path())
        .env("NOW", "2024-03-01 12:00:00")
        .env("ACTIVEMONITOR_SUPPRESS", "activemonitor")
        .arg("rec")
        .assert()
        .success()
        .stdout("suppressed\n");
    assert!(!home.path().join("shards/20240301.db").exists());
}

#[test]
fn show_prints_one_line_per_bucket() {
    let home = TempDir::new().expect("tempdir");
    for now in ["2024-03-01 05:00:00", "2024-03-01 05:00:01", "2024-03-01 05:05:00"] {
        rec_at(home.path(), now);
    }

    let output = am_cmd(home.path())
        .args(["show", "--date", "2024-03-01"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let text = String::from_utf8(output.stdout).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 288);
    assert_eq!(lines[0], "[2024-03-01 05:00:00]: **");
    assert_eq!(lines[1], "[2024-03-01 05:05:00]: *");
    assert_eq!(lines[287], "[2024-03-02 04:55:00]: ");
}

#[test]
fn show_defaults_to_current_activity_day() {
    let home = TempDir::new().expect("tempdir");
    rec_at(home.path(), "2024-03-02 01:00:00");

    let output = am_cmd(home.path())
        .env("NOW", "2024-03-02 03:00:00")
        .args(["show", "--interval", "3600", "--json"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["day"], "2024-03-01");
    assert_eq!(json["interval_secs"], 3600);
    assert_eq!(json["buckets"].as_array().map(Vec::len), Some(24));
    assert_eq!(json["buckets"][20]["start"], "2024-03-02 01:00:00");
    assert_eq!(json["buckets"][20]["count"], 1);
}

#[test]
fn show_interval_from_env() {
    let home = TempDir::new().expect("tempdir");
    rec_at(home.path(), "2024-03-01 06:00:00");
    let output = am_cmd(home.path())
        .env("ACTIVEMONITOR_INTERVAL", "21600")
        .args(["show", "--date", "2024-03-01"])
        .output()
        .expect("run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).lines().collect::<Vec<_>>(),
        vec![
            "[2024-03-01 05:00:00]: *",
            "[2024-03-01 11:00:00]: ",
            "[2024-03-01 17:00:00]: ",
            "[2024-03-01 23:00:00]: ",
        ]
    );
}

#[test]
fn show_missing_shard_is_shard_unavailable() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .args(["show", "--date", "2024-03-01"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("E1001"));
    assert!(!home.path().join("shards/20240301.db").exists());
}

#[test]
fn show_rejects_bad_input() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .args(["show", "--date", "03/01/2024"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));

    am_cmd(home.path())
        .args(["show", "--interval", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));

    am_cmd(home.path())
        .env("NOW", "yesterday")
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}

#[test]
fn day_offset_is_configurable() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .env("NOW", "2024-03-01 23:30:00")
        .env("ACTIVEMONITOR_DAY_OFFSET", "-1")
        .arg("rec")
        .assert()
        .success();
    assert!(home.path().join("shards/20240302.db").is_file());
}

#[cfg(target_os = "linux")]
#[test]
fn config_file_sets_defaults() {
    let home = TempDir::new().expect("tempdir");
    let config_dir = home.path().join(".config/activemonitor");
    std::fs::create_dir_all(&config_dir).expect("mkdir");
    std::fs::write(config_dir.join("config.toml"), "interval_secs = 43200\n").expect("write");
    rec_at(home.path(), "2024-03-01 12:00:00");

    let output = am_cmd(home.path())
        .args(["show", "--date", "2024-03-01"])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);
}

#[test]
fn days_lists_shards_with_counts() {
    let home = TempDir::new().expect("tempdir");
    rec_at(home.path(), "2024-03-01 12:00:00");
    rec_at(home.path(), "2024-03-01 12:00:01");
    rec_at(home.path(), "2024-03-03 12:00:00");
    std::fs::write(home.path().join("shards/notes.txt"), b"x").expect("write");

    am_cmd(home.path())
        .arg("days")
        .assert()
        .success()
        .stdout("2024-03-01\t2\n2024-03-03\t1\n");

    let output = am_cmd(home.path()).args(["days", "--json"]).output().expect("run");
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json.as_array().map(Vec::len), Some(2));
    assert_eq!(json[0]["day"], "2024-03-01");
    assert_eq!(json[0]["events"], 2);
}

#[test]
fn days_reports_unreadable_shard_and_continues() {
    let home = TempDir::new().expect("tempdir");
    rec_at(home.path(), "2024-03-01 12:00:00");
    rec_at(home.path(), "2024-03-03 12:00:00");
    std::fs::write(home.path().join("shards/20240302.db"), b"not a database").expect("write");

    am_cmd(home.path())
        .arg("days")
        .assert()
        .success()
        .stdout("2024-03-01\t1\n2024-03-02\tunreadable\n2024-03-03\t1\n");

    let output = am_cmd(home.path()).args(["days", "--json"]).output().expect("run");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json.as_array().map(Vec::len), Some(3));
    assert_eq!(json[1]["day"], "2024-03-02");
    assert!(json[1]["events"].is_null());
    assert!(json[1]["error"].is_string());
    assert_eq!(json[2]["events"], 1);
}

#[test]
fn days_on_missing_dir_is_empty() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path()).arg("days").assert().success().stdout("");
}
