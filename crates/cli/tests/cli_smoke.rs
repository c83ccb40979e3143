//! CLI smoke tests for tgsync.
//!
//! These tests verify that every subcommand parses its arguments and returns
//! the expected exit codes without touching a real control plane.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::TempDir;

/// Get a Command for the tgsync binary with an isolated state directory.
fn tgsync_cmd(state: &TempDir) -> Command {
  let mut cmd: Command = cargo_bin_cmd!("tgsync");
  cmd.env("TGSYNC_STATE_DIR", state.path());
  cmd.env_remove("TGSYNC_MAX_RETRIES");
  cmd.env_remove("TGSYNC_RETRY_DELAY");
  cmd.env("AWS_REGION", "us-east-1");
  cmd
}

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state)
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state)
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("tgsync"));
}

#[test]
fn subcommand_help_works() {
  let state = TempDir::new().unwrap();
  for cmd in &["invoke", "plan", "status"] {
    tgsync_cmd(&state)
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

#[test]
fn unknown_subcommand_fails() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state).arg("apply").assert().failure();
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
#[serial]
fn invoke_missing_event_fails() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state)
    .arg("invoke")
    .arg("/nonexistent/event.json")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read event file"));
}

#[test]
#[serial]
fn invoke_malformed_event_fails() {
  let state = TempDir::new().unwrap();
  let event = state.path().join("event.json");
  std::fs::write(&event, r#"{"op": "replace"}"#).unwrap();

  tgsync_cmd(&state)
    .arg("invoke")
    .arg(&event)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid event"));
}

#[test]
#[serial]
fn invalid_retry_setting_fails() {
  let state = TempDir::new().unwrap();
  let event = state.path().join("event.json");
  std::fs::write(&event, r#"{"op": "upsert", "component_name": "web"}"#).unwrap();

  tgsync_cmd(&state)
    .env("TGSYNC_MAX_RETRIES", "many")
    .arg("invoke")
    .arg(&event)
    .assert()
    .failure()
    .stderr(predicate::str::contains("Invalid configuration"));
}

// =============================================================================
// Status
// =============================================================================

#[test]
#[serial]
fn status_on_empty_state_succeeds() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state)
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("No target groups"));
}

#[test]
#[serial]
fn status_json_on_empty_state_is_empty_array() {
  let state = TempDir::new().unwrap();
  tgsync_cmd(&state)
    .args(["status", "--json"])
    .assert()
    .success()
    .stdout(predicate::str::contains("[]"));
}
