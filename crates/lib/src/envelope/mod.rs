//! The operation envelope and the invocation boundary types.
//!
//! An [`OperationEnvelope`] is the unit of continuity across retries. It is
//! created fresh at the start of a reconciliation, handed back to the caller
//! verbatim whenever an operation asks to be retried later, and discarded once
//! the invocation finishes or fails permanently.
//!
//! # Example Envelope
//!
//! ```json
//! {
//!   "pending": [{ "op": "update_advanced_attributes" }],
//!   "state": {
//!     "target_group_arn": "arn:aws:elasticloadbalancing:us-east-1:000000000000:targetgroup/web/0123456789abcdef",
//!     "region": "us-east-1",
//!     "advanced_update": { "stickiness.enabled": "false" }
//!   },
//!   "outputs": { "props": {}, "links": {}, "logs": [] },
//!   "progress": 80,
//!   "retries": { "update_advanced_attributes:transient": 1 }
//! }
//! ```

mod event;
mod types;

pub use event::*;
pub use types::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::CONSOLE_LINK_TITLE;

/// Pending operations plus everything that must survive a retry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationEnvelope {
  pub pending: PendingOperations,
  pub state: PersistentState,
  pub outputs: Outputs,
  pub progress: u8,

  /// Attempts consumed per retry key.
  pub retries: BTreeMap<String, u32>,
}

impl OperationEnvelope {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn enqueue(&mut self, op: Operation) {
    self.pending.push(op);
  }

  pub fn add_log(&mut self, title: impl Into<String>, details: serde_json::Value) {
    self.outputs.logs.push(LogEntry {
      title: title.into(),
      details,
      is_error: false,
    });
  }

  pub fn add_error_log(&mut self, title: impl Into<String>, details: serde_json::Value) {
    self.outputs.logs.push(LogEntry {
      title: title.into(),
      details,
      is_error: true,
    });
  }

  /// Record the console link for the target group.
  pub fn set_console_link(&mut self, url: String) {
    self.outputs.links.insert(CONSOLE_LINK_TITLE.to_string(), url);
  }

  /// Count one more attempt against `key`, returning the new total.
  pub fn record_retry(&mut self, key: &str) -> u32 {
    let attempts = self.retries.entry(key.to_string()).or_insert(0);
    *attempts += 1;
    *attempts
  }

  /// Forget the resource identity after a successful delete.
  pub fn clear_identity(&mut self) {
    self.state.target_group_arn = None;
    self.outputs.props = Props::default();
    self.outputs.links.remove(CONSOLE_LINK_TITLE);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn pending_operations_keep_one_per_kind() {
    let mut envelope = OperationEnvelope::new();
    envelope.enqueue(Operation::AddTags {
      tags: [("a".to_string(), "1".to_string())].into(),
    });
    envelope.enqueue(Operation::AddTags {
      tags: [("b".to_string(), "2".to_string())].into(),
    });

    assert_eq!(envelope.pending.len(), 1);
    match envelope.pending.get(OperationKind::AddTags) {
      Some(Operation::AddTags { tags }) => assert!(tags.contains_key("b")),
      other => panic!("unexpected pending operation: {:?}", other),
    }
  }

  #[test]
  fn pending_operations_serialize_in_execution_order() {
    let mut pending = PendingOperations::default();
    pending.push(Operation::DeleteResource);
    pending.push(Operation::UpdateCoreAttributes);
    pending.push(Operation::FetchLiveState);

    let value = serde_json::to_value(&pending).unwrap();
    assert_eq!(
      value,
      json!([
        { "op": "fetch_live_state" },
        { "op": "update_core_attributes" },
        { "op": "delete_resource" },
      ])
    );
  }

  #[test]
  fn execution_order_matches_ord() {
    let mut sorted = OperationKind::EXECUTION_ORDER;
    sorted.sort();
    assert_eq!(sorted, OperationKind::EXECUTION_ORDER);
  }

  #[test]
  fn envelope_survives_a_json_trip_verbatim() {
    let mut envelope = OperationEnvelope::new();
    envelope.enqueue(Operation::RemoveTags {
      keys: ["stale".to_string()].into(),
    });
    envelope.state.target_group_arn = Some("arn:tg".to_string());
    envelope.state.advanced_update = Some([("stickiness.enabled".to_string(), "false".to_string())].into());
    envelope.progress = 90;
    envelope.record_retry("remove_tags:transient");
    envelope.add_log("Got Tags", json!({ "count": 1 }));

    let text = serde_json::to_string(&envelope).unwrap();
    let back: OperationEnvelope = serde_json::from_str(&text).unwrap();
    assert_eq!(back, envelope);
  }

  #[test]
  fn record_retry_counts_per_key() {
    let mut envelope = OperationEnvelope::new();
    assert_eq!(envelope.record_retry("a"), 1);
    assert_eq!(envelope.record_retry("a"), 2);
    assert_eq!(envelope.record_retry("b"), 1);
  }

  #[test]
  fn clear_identity_drops_arn_props_and_link() {
    let mut envelope = OperationEnvelope::new();
    envelope.state.target_group_arn = Some("arn:tg".to_string());
    envelope.outputs.props.arn = Some("arn:tg".to_string());
    envelope.set_console_link("https://console".to_string());

    envelope.clear_identity();

    assert!(envelope.state.target_group_arn.is_none());
    assert_eq!(envelope.outputs.props, Props::default());
    assert!(envelope.outputs.links.is_empty());
  }
}
