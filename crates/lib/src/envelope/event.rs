//! Inbound event and outbound result shapes exchanged with the harness.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::desired::ComponentDef;

use super::{LogEntry, OperationEnvelope, Props};

/// What the harness asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationKind {
  Upsert,
  Delete,
}

/// State recorded by the harness after the previous successful invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorState {
  pub props: Props,
}

/// One invocation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
  pub op: InvocationKind,

  /// Harness-generated name, used when the definition has no `name`.
  #[serde(default)]
  pub component_name: String,

  #[serde(default)]
  pub component_def: ComponentDef,

  #[serde(default)]
  pub prev_state: Option<PriorState>,

  /// Continuation returned by a previous attempt that asked to be retried.
  #[serde(default)]
  pub pass_back_data: Option<OperationEnvelope>,
}

/// Errors that can occur while reading an inbound event.
#[derive(Debug, Error)]
pub enum EnvelopeError {
  /// The event is not valid JSON or does not match the expected shape.
  #[error("failed to parse event: {0}")]
  Parse(#[source] serde_json::Error),
}

impl InboundEvent {
  pub fn from_json(text: &str) -> Result<Self, EnvelopeError> {
    serde_json::from_str(text).map_err(EnvelopeError::Parse)
  }

  /// Props recorded by the previous invocation, empty if there was none.
  pub fn prior_props(&self) -> Props {
    self.prev_state.as_ref().map(|s| s.props.clone()).unwrap_or_default()
  }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
  Succeeded,
  /// Not finished; the caller should invoke again with the continuation.
  Retrying,
  Failed,
}

/// Outbound result envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
  pub success: bool,
  pub progress: u8,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default)]
  pub props: Props,
  #[serde(default)]
  pub links: BTreeMap<String, String>,
  #[serde(default)]
  pub logs: Vec<LogEntry>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pass_back_data: Option<OperationEnvelope>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub callback_sec: Option<u64>,
}

impl InvocationResult {
  /// Queue drained without error.
  pub fn finished(envelope: OperationEnvelope) -> Self {
    Self {
      success: true,
      progress: 100,
      error: None,
      props: envelope.outputs.props,
      links: envelope.outputs.links,
      logs: envelope.outputs.logs,
      pass_back_data: None,
      callback_sec: None,
    }
  }

  /// Permanent failure. The envelope is discarded.
  pub fn failed(envelope: OperationEnvelope, message: String, progress: u8) -> Self {
    Self {
      success: false,
      progress,
      error: Some(message),
      props: envelope.outputs.props,
      links: envelope.outputs.links,
      logs: envelope.outputs.logs,
      pass_back_data: None,
      callback_sec: None,
    }
  }

  /// Not finished. The envelope travels back to the caller as continuation.
  pub fn retry(envelope: OperationEnvelope, delay: Duration) -> Self {
    Self {
      success: false,
      progress: envelope.progress,
      error: None,
      props: envelope.outputs.props.clone(),
      links: envelope.outputs.links.clone(),
      logs: envelope.outputs.logs.clone(),
      callback_sec: Some(callback_seconds(delay)),
      pass_back_data: Some(envelope),
    }
  }

  pub fn status(&self) -> InvocationStatus {
    if self.success {
      InvocationStatus::Succeeded
    } else if self.pass_back_data.is_some() {
      InvocationStatus::Retrying
    } else {
      InvocationStatus::Failed
    }
  }
}

/// Whole seconds to wait before the next attempt. Partial seconds round up so
/// a sub-second delay never becomes an immediate retry.
fn callback_seconds(delay: Duration) -> u64 {
  delay.as_secs() + u64::from(delay.subsec_nanos() > 0)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn parse_minimal_upsert() {
    let event = InboundEvent::from_json(r#"{"op": "upsert", "component_name": "web"}"#).unwrap();
    assert_eq!(event.op, InvocationKind::Upsert);
    assert_eq!(event.component_name, "web");
    assert!(event.pass_back_data.is_none());
    assert_eq!(event.prior_props(), Props::default());
  }

  #[test]
  fn unknown_operation_is_rejected() {
    let result = InboundEvent::from_json(r#"{"op": "resize"}"#);
    assert!(matches!(result, Err(EnvelopeError::Parse(_))));
  }

  #[test]
  fn null_prev_state_means_no_prior_props() {
    let event = InboundEvent::from_json(r#"{"op": "delete", "prev_state": null}"#).unwrap();
    assert_eq!(event.prior_props(), Props::default());
  }

  #[test]
  fn prior_props_are_read() {
    let event = InboundEvent::from_json(
      &json!({
        "op": "delete",
        "prev_state": { "props": { "name": "web", "arn": "arn:tg", "port": 443 } }
      })
      .to_string(),
    )
    .unwrap();
    let props = event.prior_props();
    assert_eq!(props.arn.as_deref(), Some("arn:tg"));
    assert_eq!(props.port, Some(443));
  }

  #[test]
  fn status_reflects_outcome() {
    let done = InvocationResult::finished(OperationEnvelope::new());
    assert_eq!(done.status(), InvocationStatus::Succeeded);
    assert_eq!(done.progress, 100);

    let failed = InvocationResult::failed(OperationEnvelope::new(), "boom".to_string(), 20);
    assert_eq!(failed.status(), InvocationStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("boom"));

    let retry = InvocationResult::retry(OperationEnvelope::new(), Duration::from_secs(10));
    assert_eq!(retry.status(), InvocationStatus::Retrying);
    assert_eq!(retry.callback_sec, Some(10));
  }

  #[test]
  fn partial_second_delays_round_up() {
    let retry = InvocationResult::retry(OperationEnvelope::new(), Duration::from_millis(500));
    assert_eq!(retry.callback_sec, Some(1));

    let retry = InvocationResult::retry(OperationEnvelope::new(), Duration::from_millis(10_250));
    assert_eq!(retry.callback_sec, Some(11));

    let retry = InvocationResult::retry(OperationEnvelope::new(), Duration::ZERO);
    assert_eq!(retry.callback_sec, Some(0));
  }
}
