//! Integration tests for the CLI binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_home(steps: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("steps.yml"), steps).unwrap();
    temp
}

fn stagehand(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--home").arg(home.path());
    cmd
}

const SIMPLE_STEPS: &str = "steps:\n- name: director\n  script: echo director ready\n- name: cf\n  script: echo cf ready\n";

#[test]
fn cli_shows_help() {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("installation workflow engine"));
}

#[test]
fn cli_shows_version() {
    let mut cmd = Command::new(cargo_bin("stagehand"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn list_shows_steps_with_positions() {
    let temp = setup_home(SIMPLE_STEPS);
    stagehand(&temp)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("director"))
        .stdout(predicate::str::contains("cf"))
        .stdout(predicate::str::contains("READY"));
}

#[test]
fn list_json_is_machine_readable() {
    let temp = setup_home(SIMPLE_STEPS);
    stagehand(&temp)
        .args(["list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"director\""));
}

#[test]
fn list_without_sequence_file_fails() {
    let temp = TempDir::new().unwrap();
    stagehand(&temp)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn apply_overwrite_then_get_shows_the_step() {
    let temp = TempDir::new().unwrap();
    let doc = temp.path().join("incoming.yml");
    fs::write(&doc, SIMPLE_STEPS).unwrap();

    stagehand(&temp)
        .args(["apply", doc.to_str().unwrap(), "--overwrite"])
        .assert()
        .success();

    stagehand(&temp)
        .args(["get", "director"])
        .assert()
        .success()
        .stdout(predicate::str::contains("director"));
}

#[test]
fn run_executes_scripts_and_records_success() {
    let temp = setup_home(SIMPLE_STEPS);

    stagehand(&temp).arg("run").assert().success();

    stagehand(&temp)
        .args(["get", "director"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCEEDED"));
}

#[test]
fn run_failure_exits_nonzero_and_records_reason() {
    let temp = setup_home("steps:\n- name: broken\n  script: \"echo bad; exit 3\"\n");

    stagehand(&temp)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken"));

    stagehand(&temp)
        .args(["get", "broken"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FAILED"));
}

#[test]
fn log_serves_the_mock_source() {
    let temp = setup_home(SIMPLE_STEPS);
    stagehand(&temp)
        .args(["log", "mock", "--position", "2", "--length", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mock log line 002"))
        .stdout(predicate::str::contains("mock log line 003"))
        .stdout(predicate::str::contains("mock log line 004").not());
}

#[test]
fn running_exit_code_reflects_idle_state() {
    let temp = setup_home(SIMPLE_STEPS);
    stagehand(&temp)
        .arg("running")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("false"));
}

#[test]
fn set_status_skip_then_run_passes_over() {
    let temp = setup_home(SIMPLE_STEPS);

    stagehand(&temp)
        .args(["set-status", "director", "--status", "SKIP"])
        .assert()
        .success();
    stagehand(&temp).arg("run").assert().success();

    stagehand(&temp)
        .args(["get", "director"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SKIP"));
    stagehand(&temp)
        .args(["get", "cf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCEEDED"));
}

#[test]
fn delete_protected_step_is_refused() {
    let temp = setup_home("steps:\n- name: core\n  protected: true\n");

    stagehand(&temp)
        .args(["delete", "--name", "core"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("protected"));
}

#[test]
fn completions_generate_for_bash() {
    let temp = TempDir::new().unwrap();
    stagehand(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stagehand"));
}
