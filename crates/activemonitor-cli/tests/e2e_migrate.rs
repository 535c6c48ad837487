//! E2E tests for `migrate`.

use activemonitor_core::EventStore;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
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

fn seed_legacy(path: &Path, literals: &[&str]) {
    let store = EventStore::open(path).expect("legacy store");
    for literal in literals {
        store.record_raw(literal).expect("seed");
    }
}

fn shard_count(home: &Path, name: &str) -> u64 {
    EventStore::open_existing(&home.join("shards").join(name))
        .expect("shard")
        .count()
        .expect("count")
}

const EVENTS: &[&str] = &[
    "2024-03-01 05:00:00",
    "2024-03-01 23:30:00",
    "2024-03-02 04:59:59",
    "2024-03-02 05:00:00",
    "2024-03-04 10:00:00",
];

#[test]
fn migrate_default_legacy_path_from_home() {
    let home = TempDir::new().expect("tempdir");
    seed_legacy(&home.path().join(".activemonitor.db"), EVENTS);

    am_cmd(home.path())
        .arg("migrate")
        .assert()
        .success()
        .stdout(predicate::str::contains("migrated 5 of 5 events across 3 days"));

    assert_eq!(shard_count(home.path(), "20240301.db"), 3);
    assert_eq!(shard_count(home.path(), "20240302.db"), 1);
    assert_eq!(shard_count(home.path(), "20240304.db"), 1);
}

#[test]
fn migrate_source_flag_and_json_report() {
    let home = TempDir::new().expect("tempdir");
    let legacy: PathBuf = home.path().join("old.db");
    seed_legacy(&legacy, EVENTS);

    let output = am_cmd(home.path())
        .args(["migrate", "--json", "--jobs", "2", "--source"])
        .arg(&legacy)
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["events_seen"], 5);
    assert_eq!(json["events_migrated"], 5);
    assert_eq!(json["days"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["days"][0]["day"], "2024-03-01");
    assert!(json["peak_concurrency"].as_u64().is_some_and(|p| (1..=2).contains(&p)));
}

#[test]
fn migrate_db_path_env_is_used() {
    let home = TempDir::new().expect("tempdir");
    let legacy = home.path().join("env.db");
    seed_legacy(&legacy, &["2024-03-01 12:00:00"]);

    am_cmd(home.path())
        .env("DB_PATH", &legacy)
        .arg("migrate")
        .assert()
        .success();
    assert_eq!(shard_count(home.path(), "20240301.db"), 1);
}

#[test]
fn rerun_reports_every_day_failed() {
    let home = TempDir::new().expect("tempdir");
    seed_legacy(&home.path().join(".activemonitor.db"), EVENTS);
    am_cmd(home.path()).arg("migrate").assert().success();

    am_cmd(home.path())
        .arg("migrate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("migrated 0 of 5 events across 3 days"))
        .stderr(predicate::str::contains("E4001"))
        .stderr(predicate::str::contains("3 of 3 days failed"));

    assert_eq!(shard_count(home.path(), "20240301.db"), 3);
}

#[test]
fn missing_legacy_store_is_shard_unavailable() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .arg("migrate")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("E1001"));
    assert!(!home.path().join(".activemonitor.db").exists());
    assert!(!home.path().join("shards").exists());
}

#[test]
fn zero_jobs_is_invalid_input() {
    let home = TempDir::new().expect("tempdir");
    am_cmd(home.path())
        .args(["migrate", "--jobs", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"));
}
