//! End-to-end smoke tests for the offline subcommands.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn ghist(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ghist").unwrap();
    cmd.arg("--db")
        .arg(home.join("gh.db"))
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("GHIST_DB")
        .env_remove("GHIST_LOG");
    cmd
}

#[test]
fn test_init_add_status() {
    let home = TempDir::new().unwrap();

    ghist(home.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    ghist(home.path())
        .args(["add", "golang/go"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tracking golang/go"));

    ghist(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("golang/go (0 raw events)"));
}

#[test]
fn test_init_refuses_twice() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_add_without_init_suggests_fix() {
    let home = TempDir::new().unwrap();
    ghist(home.path())
        .args(["add", "golang/go"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Database not found"))
        .stderr(predicate::str::contains("ghist init"));
}

#[test]
fn test_add_rejects_bare_name() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path())
        .args(["add", "golang"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("owner/repo"));
}

#[test]
fn test_add_same_project_twice() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path()).args(["add", "golang/go"]).assert().success();
    ghist(home.path())
        .args(["add", "golang/go"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already stored"));
}

#[test]
fn test_refill_on_empty_project() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path()).args(["add", "golang/go"]).assert().success();
    ghist(home.path())
        .arg("refill")
        .assert()
        .success()
        .stdout(predicate::str::contains("golang/go: 0 history actions"));
}

#[test]
fn test_sync_without_projects_tracked() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path())
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no projects tracked"));
}

#[test]
fn test_report_requires_project() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path())
        .arg("report")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no project given"));
}

#[test]
fn test_status_json_shape() {
    let home = TempDir::new().unwrap();
    ghist(home.path()).arg("init").assert().success();
    ghist(home.path()).args(["add", "golang/go"]).assert().success();

    let output = ghist(home.path())
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rows: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(rows[0]["project"], "golang/go");
    assert_eq!(rows[0]["event_id"], 0);
}
