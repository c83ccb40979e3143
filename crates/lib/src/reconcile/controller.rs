//! Starting operations for an invocation.

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::console_link;
use crate::desired::DesiredState;
use crate::envelope::{InvocationKind, Operation, OperationEnvelope, Props};

/// Failures raised before any remote call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
  #[error(
    "Cannot change {} of an existing target group; these fields are immutable after creation. \
     Create a new target group, move the listener to it, then delete this one.",
    .fields.join(", ")
  )]
  ImmutableFieldChanged { fields: Vec<&'static str> },
}

impl ControllerError {
  /// Progress reported with the failure.
  pub fn progress(&self) -> u8 {
    match self {
      ControllerError::ImmutableFieldChanged { .. } => 0,
    }
  }
}

/// Immutable fields recorded in `prior` that differ from `desired`.
///
/// Fields the prior props do not record are not compared.
pub fn changed_immutable_fields(prior: &Props, desired: &DesiredState) -> Vec<&'static str> {
  let core = &desired.core;
  let mut changed = Vec::new();

  let mut check = |field: &'static str, differs: bool| {
    if differs {
      changed.push(field);
    }
  };

  check("name", prior.name.as_ref().is_some_and(|v| *v != core.name));
  check("protocol", prior.protocol.as_ref().is_some_and(|v| *v != core.protocol));
  check(
    "protocol_version",
    prior
      .protocol_version
      .as_ref()
      .is_some_and(|v| *v != core.protocol_version),
  );
  check("port", prior.port.is_some_and(|v| v != core.port));
  check(
    "vpc_id",
    prior
      .vpc_id
      .as_ref()
      .is_some_and(|v| core.vpc_id.as_ref() != Some(v)),
  );
  check(
    "target_type",
    prior.target_type.as_ref().is_some_and(|v| *v != core.target_type),
  );
  check(
    "ip_address_type",
    prior
      .ip_address_type
      .as_ref()
      .is_some_and(|v| *v != core.ip_address_type),
  );

  changed
}

/// Decide the envelope an invocation starts from.
///
/// A non-empty `continuation` is returned verbatim. Otherwise a fresh
/// envelope is seeded from `prior` and the operation kind.
pub fn start(
  kind: InvocationKind,
  desired: &DesiredState,
  prior: &Props,
  continuation: Option<OperationEnvelope>,
  region: &str,
) -> Result<OperationEnvelope, ControllerError> {
  if let Some(envelope) = continuation {
    if !envelope.pending.is_empty() {
      debug!(pending = ?envelope.pending.kinds(), "resuming from continuation");
      return Ok(envelope);
    }
    debug!("continuation has nothing pending, starting fresh");
  }

  let mut envelope = OperationEnvelope::new();
  envelope.state.region = Some(region.to_string());
  envelope.outputs.props = prior.clone();

  match kind {
    InvocationKind::Upsert => {
      if prior.has_identity() {
        let fields = changed_immutable_fields(prior, desired);
        if !fields.is_empty() {
          return Err(ControllerError::ImmutableFieldChanged { fields });
        }
      }
      envelope.enqueue(Operation::FetchLiveState);
    }
    InvocationKind::Delete => match &prior.arn {
      Some(arn) => {
        envelope.state.target_group_arn = Some(arn.clone());
        envelope.set_console_link(console_link(region, arn));
        envelope.enqueue(Operation::DeleteResource);
      }
      None => {
        info!(name = ?prior.name, "no recorded target group, nothing to delete");
        envelope.add_log("Nothing to Delete", json!({ "name": prior.name }));
      }
    },
  }

  Ok(envelope)
}
