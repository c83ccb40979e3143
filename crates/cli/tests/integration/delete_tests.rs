//! Delete invocation integration tests.

use predicates::prelude::*;
use serde_json::{Value, json};

use super::common::TestEnv;

fn delete_event(env: &TestEnv, props: &Value) -> std::path::PathBuf {
  env.write_json(
    "delete.json",
    &json!({
      "op": "delete",
      "component_name": "web",
      "component_def": { "name": "web-tg" },
      "prev_state": { "props": props }
    }),
  )
}

#[test]
fn delete_removes_target_group() {
  let env = TestEnv::from_fixture("upsert_minimal.json");
  env.invoke_saving("created.json").success();
  let props = env.read_json("created.json")["props"].clone();

  let event = delete_event(&env, &props);
  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&event)
    .arg("--output")
    .arg(env.temp.path().join("deleted.json"))
    .assert()
    .success();

  let table = env.table();
  assert!(table["target_groups"].get("web-tg").is_none());
  let deleted = env.read_json("deleted.json");
  assert_eq!(deleted["success"], true);
  assert!(deleted["props"].get("arn").is_none() || deleted["props"]["arn"].is_null());
}

#[test]
fn delete_without_arn_is_a_noop() {
  let env = TestEnv::from_fixture("delete_without_arn.json");

  env
    .tgsync_cmd()
    .args(["invoke", "--verbose"])
    .arg(&env.event_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("Nothing to Delete"));
}

#[test]
fn delete_attached_target_group_fails() {
  let env = TestEnv::from_fixture("upsert_minimal.json");
  env.invoke_saving("created.json").success();
  let props = env.read_json("created.json")["props"].clone();

  let mut table = env.table();
  table["target_groups"]["web-tg"]["target_group"]["load_balancer_arns"] = json!([
    "arn:aws:elasticloadbalancing:us-east-1:000000000000:loadbalancer/app/front/0123456789abcdef"
  ]);
  env.write_table(&table);

  let event = delete_event(&env, &props);
  env
    .tgsync_cmd()
    .arg("invoke")
    .arg(&event)
    .arg("--output")
    .arg(env.temp.path().join("blocked.json"))
    .assert()
    .failure()
    .code(1)
    .stderr(predicate::str::contains("attached to a load balancer"));

  assert!(env.table()["target_groups"].get("web-tg").is_some());
  let blocked = env.read_json("blocked.json");
  assert_eq!(blocked["progress"], 80);
  assert_eq!(blocked["props"]["arn"], props["arn"]);
}
