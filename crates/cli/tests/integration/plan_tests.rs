//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn plan_shows_desired_state_and_operations() {
  let env = TestEnv::from_fixture("upsert_tags.yaml");

  env
    .tgsync_cmd()
    .arg("plan")
    .arg(&env.event_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Target group api-tg"))
    .stdout(predicate::str::contains("deregistration_delay.timeout_seconds"))
    .stdout(predicate::str::contains("fetch_live_state"));
}

#[test]
fn plan_never_creates_state() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  env.tgsync_cmd().arg("plan").arg(&env.event_path).assert().success();

  assert!(!env.state_path().join("control-plane.json").exists());
}

#[test]
fn plan_json_lists_pending_operations() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  let output = env
    .tgsync_cmd()
    .args(["plan", "--json"])
    .arg(&env.event_path)
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(plan["op"], "upsert");
  assert_eq!(plan["desired"]["core"]["port"], 8443);
  assert_eq!(plan["pending"], serde_json::json!(["fetch_live_state"]));
}

#[test]
fn plan_for_delete_without_arn_has_nothing_to_do() {
  let env = TestEnv::from_fixture("delete_without_arn.json");

  env
    .tgsync_cmd()
    .arg("plan")
    .arg(&env.event_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to do"));
}
