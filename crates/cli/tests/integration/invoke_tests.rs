//! Invoke command integration tests.

use predicates::prelude::*;
use serde_json::json;

use super::common::TestEnv;

#[test]
fn upsert_creates_target_group() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&env.event_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Invocation finished"))
    .stdout(predicate::str::contains("web-tg"));

  let table = env.table();
  let stored = &table["target_groups"]["web-tg"];
  assert_eq!(stored["target_group"]["port"], 8443);
  assert_eq!(stored["tags"]["env"], "prod");
}

#[test]
fn upsert_writes_result_file() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  env.invoke_saving("result.json").success();

  let result = env.read_json("result.json");
  assert_eq!(result["success"], true);
  assert_eq!(result["progress"], 100);
  assert_eq!(result["props"]["name"], "web-tg");
  assert!(
    result["props"]["arn"]
      .as_str()
      .unwrap()
      .starts_with("arn:aws:elasticloadbalancing:us-east-1:")
  );
  assert!(result.get("pass_back_data").is_none() || result["pass_back_data"].is_null());
}

#[test]
fn yaml_event_applies_advanced_attributes() {
  let env = TestEnv::from_fixture("upsert_tags.yaml");

  env.invoke_saving("result.json").success();

  let table = env.table();
  let stored = &table["target_groups"]["api-tg"];
  assert_eq!(stored["attributes"]["deregistration_delay.timeout_seconds"], "30");
  assert_eq!(stored["attributes"]["stickiness.enabled"], "true");
  assert_eq!(stored["tags"]["team"], "platform");
  assert_eq!(stored["target_group"]["health_check"]["path"], "/healthz");
}

#[test]
fn second_upsert_is_idempotent() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  env.invoke_saving("first.json").success();
  let before = env.table();

  env.invoke_saving("second.json").success();
  let after = env.table();

  assert_eq!(before, after);
  assert_eq!(env.read_json("first.json")["props"], env.read_json("second.json")["props"]);
}

#[test]
fn json_flag_prints_result() {
  let env = TestEnv::from_fixture("upsert_minimal.json");

  env
    .tgsync_cmd()
    .args(["invoke", "--json"])
    .arg(&env.event_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("\"success\": true"))
    .stdout(predicate::str::contains("\"progress\": 100"));
}

#[test]
fn invalid_health_check_exits_nonzero() {
  let env = TestEnv::from_fixture("invalid_health_check.json");

  env
    .invoke_saving("result.json")
    .failure()
    .code(1)
    .stderr(predicate::str::contains("Invalid target group parameters"));

  let result = env.read_json("result.json");
  assert_eq!(result["success"], false);
  assert_eq!(result["progress"], 20);
}

#[test]
fn immutable_change_is_rejected_without_changes() {
  let env = TestEnv::from_fixture("upsert_minimal.json");
  env.invoke_saving("created.json").success();
  let before = env.table();
  let created = env.read_json("created.json");

  let event = env.write_json(
    "change_port.json",
    &json!({
      "op": "upsert",
      "component_name": "web",
      "component_def": {
        "name": "web-tg",
        "vpc_id": "vpc-0123456789abcdef0",
        "port": 9443,
        "tags": { "env": "prod" }
      },
      "prev_state": { "props": created["props"] }
    }),
  );

  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&event)
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("port"));

  assert_eq!(env.table(), before);
}

#[test]
fn resume_from_finished_result_fails() {
  let env = TestEnv::from_fixture("upsert_minimal.json");
  env.invoke_saving("result.json").success();

  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&env.event_path)
    .arg("--resume")
    .arg(env.temp.path().join("result.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Nothing to resume"))
    .stderr(predicate::str::contains("finished invocation"));
}

#[test]
fn resume_from_failed_result_fails() {
  let env = TestEnv::from_fixture("invalid_health_check.json");
  env.invoke_saving("result.json").failure().code(1);

  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&env.event_path)
    .arg("--resume")
    .arg(env.temp.path().join("result.json"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Nothing to resume"))
    .stderr(predicate::str::contains("failed invocation"));
}

#[test]
fn status_lists_created_target_group() {
  let env = TestEnv::from_fixture("upsert_minimal.json");
  env.invoke_saving("result.json").success();

  env
    .tgsync_cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("1 target group(s)"))
    .stdout(predicate::str::contains("web-tg"))
    .stdout(predicate::str::contains("HTTPS:8443"));
}
