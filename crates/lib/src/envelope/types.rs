use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::client::TargetGroup;
use crate::desired::{AdvancedAttributes, Tags};

/// The kinds of operation, in the order the execution loop visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
  FetchLiveState,
  CreateResource,
  UpdateCoreAttributes,
  UpdateAdvancedAttributes,
  ResetAdvancedAttributes,
  RemoveTags,
  AddTags,
  DeleteResource,
}

impl OperationKind {
  /// Fixed execution order. Matches the `Ord` derive.
  pub const EXECUTION_ORDER: [OperationKind; 8] = [
    OperationKind::FetchLiveState,
    OperationKind::CreateResource,
    OperationKind::UpdateCoreAttributes,
    OperationKind::UpdateAdvancedAttributes,
    OperationKind::ResetAdvancedAttributes,
    OperationKind::RemoveTags,
    OperationKind::AddTags,
    OperationKind::DeleteResource,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      OperationKind::FetchLiveState => "fetch_live_state",
      OperationKind::CreateResource => "create_resource",
      OperationKind::UpdateCoreAttributes => "update_core_attributes",
      OperationKind::UpdateAdvancedAttributes => "update_advanced_attributes",
      OperationKind::ResetAdvancedAttributes => "reset_advanced_attributes",
      OperationKind::RemoveTags => "remove_tags",
      OperationKind::AddTags => "add_tags",
      OperationKind::DeleteResource => "delete_resource",
    }
  }

  /// Progress reported when this operation fails or asks for a retry.
  pub fn checkpoint(self) -> u8 {
    match self {
      OperationKind::FetchLiveState => 10,
      OperationKind::CreateResource => 20,
      OperationKind::UpdateCoreAttributes => 70,
      OperationKind::UpdateAdvancedAttributes | OperationKind::ResetAdvancedAttributes => 80,
      OperationKind::RemoveTags | OperationKind::AddTags => 90,
      OperationKind::DeleteResource => 80,
    }
  }
}

impl std::fmt::Display for OperationKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A pending operation and its payload.
///
/// The advanced attribute operations take their mapping from
/// [`PersistentState::advanced_update`] so that a retry replays exactly the
/// mapping computed before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
  FetchLiveState,
  CreateResource,
  UpdateCoreAttributes,
  UpdateAdvancedAttributes,
  ResetAdvancedAttributes,
  RemoveTags { keys: BTreeSet<String> },
  AddTags { tags: Tags },
  DeleteResource,
}

impl Operation {
  pub fn kind(&self) -> OperationKind {
    match self {
      Operation::FetchLiveState => OperationKind::FetchLiveState,
      Operation::CreateResource => OperationKind::CreateResource,
      Operation::UpdateCoreAttributes => OperationKind::UpdateCoreAttributes,
      Operation::UpdateAdvancedAttributes => OperationKind::UpdateAdvancedAttributes,
      Operation::ResetAdvancedAttributes => OperationKind::ResetAdvancedAttributes,
      Operation::RemoveTags { .. } => OperationKind::RemoveTags,
      Operation::AddTags { .. } => OperationKind::AddTags,
      Operation::DeleteResource => OperationKind::DeleteResource,
    }
  }
}

/// Ordered set of pending operations, at most one per kind.
///
/// Serialized as a list in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Operation>", into = "Vec<Operation>")]
pub struct PendingOperations(BTreeMap<OperationKind, Operation>);

impl PendingOperations {
  /// Queue an operation. Replaces the payload of an already queued one of
  /// the same kind.
  pub fn push(&mut self, op: Operation) {
    self.0.insert(op.kind(), op);
  }

  pub fn take(&mut self, kind: OperationKind) -> Option<Operation> {
    self.0.remove(&kind)
  }

  pub fn get(&self, kind: OperationKind) -> Option<&Operation> {
    self.0.get(&kind)
  }

  pub fn contains(&self, kind: OperationKind) -> bool {
    self.0.contains_key(&kind)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn kinds(&self) -> Vec<OperationKind> {
    self.0.keys().copied().collect()
  }
}

impl From<Vec<Operation>> for PendingOperations {
  fn from(ops: Vec<Operation>) -> Self {
    let mut pending = PendingOperations::default();
    for op in ops {
      pending.push(op);
    }
    pending
  }
}

impl From<PendingOperations> for Vec<Operation> {
  fn from(pending: PendingOperations) -> Self {
    pending.0.into_values().collect()
  }
}

/// State preserved across retries of the same invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_group_arn: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,

  /// Advanced attribute mapping computed when the follow-ups were planned.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub advanced_update: Option<AdvancedAttributes>,

  /// Advanced attributes as last fetched from the live resource.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub live_advanced_attributes: Option<AdvancedAttributes>,

  /// Tags as last fetched from the live resource.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub live_tags: Option<Tags>,
}

/// Integration facts about the target group surfaced to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Props {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub arn: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub vpc_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub port: Option<u16>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub load_balancer_arns: Option<Vec<String>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub protocol_version: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub target_type: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ip_address_type: Option<String>,
}

impl Props {
  /// True if these props record a resource identity.
  pub fn has_identity(&self) -> bool {
    self.name.is_some() || self.arn.is_some()
  }
}

impl From<&TargetGroup> for Props {
  fn from(tg: &TargetGroup) -> Self {
    Self {
      name: Some(tg.name.clone()),
      arn: Some(tg.arn.clone()),
      vpc_id: tg.vpc_id.clone(),
      port: Some(tg.port),
      load_balancer_arns: Some(tg.load_balancer_arns.clone()),
      protocol: Some(tg.protocol.clone()),
      protocol_version: Some(tg.protocol_version.clone()),
      target_type: Some(tg.target_type.clone()),
      ip_address_type: Some(tg.ip_address_type.clone()),
    }
  }
}

/// A log line surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
  pub title: String,
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub details: serde_json::Value,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub is_error: bool,
}

/// Accumulated props, links and logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Outputs {
  pub props: Props,
  pub links: BTreeMap<String, String>,
  pub logs: Vec<LogEntry>,
}
