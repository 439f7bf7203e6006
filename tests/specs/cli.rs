//! Black-box CLI checks.

use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

fn drover() -> Command {
    Command::cargo_bin("drover").expect("drover binary")
}

#[test]
fn help_lists_subcommands() {
    let assert = drover().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for subcommand in ["start", "validate", "trigger", "jobs", "status"] {
        assert!(stdout.contains(subcommand), "missing {subcommand}");
    }
}

#[test]
fn version_prints() {
    drover().arg("--version").assert().success();
}

#[test]
fn validate_accepts_a_good_fleet() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("agents")).unwrap();
    fs::write(dir.path().join("agents/a.yaml"), "name: agent-1\n").unwrap();
    fs::write(
        dir.path().join("fleet.yaml"),
        "version: 1\nfleet:\n  name: ok\nagents:\n  - path: agents/a.yaml\n",
    )
    .unwrap();

    let assert = drover()
        .args(["validate", "-c"])
        .arg(dir.path().join("fleet.yaml"))
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    assert!(stdout.contains("agent-1"));
}

#[test]
fn validate_rejects_duplicates_with_nonzero_exit() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("agents")).unwrap();
    fs::write(dir.path().join("agents/a.yaml"), "name: duplicate-name\n").unwrap();
    fs::write(dir.path().join("agents/b.yaml"), "name: duplicate-name\n").unwrap();
    fs::write(
        dir.path().join("fleet.yaml"),
        "version: 1\nagents:\n  - path: agents/a.yaml\n  - path: agents/b.yaml\n",
    )
    .unwrap();

    let assert = drover()
        .args(["validate", "-c"])
        .arg(dir.path().join("fleet.yaml"))
        .assert()
        .failure();
    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("duplicate-name"));
}

#[test]
fn jobs_list_works_on_an_empty_state_dir() {
    let dir = TempDir::new().unwrap();
    drover()
        .args(["jobs", "list", "--state-dir"])
        .arg(dir.path().join("state"))
        .assert()
        .success();
}
