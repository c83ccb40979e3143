//! Reconciliation engine.
//!
//! This module drives one target group toward its desired configuration.
//! It handles:
//! - Choosing the starting operations for an invocation ([`controller`])
//! - Running pending operations in a fixed order ([`execute`])
//! - Classifying every control plane failure as retry, fatal, or ignorable
//!
//! An invocation never sleeps. A retry is handed back to the caller together
//! with the envelope to resume from.

pub mod controller;
mod execute;
mod steps;
mod types;

use serde_json::json;
use tracing::{error, info};

use crate::client::ControlPlane;
use crate::config::ReconcileConfig;
use crate::desired::DesiredState;
use crate::envelope::{InboundEvent, InvocationResult, OperationEnvelope};

pub use controller::{ControllerError, changed_immutable_fields, start};
pub use execute::execute;
pub use types::{StepContext, StepOutcome};

/// Desired state and starting envelope for an event.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
  pub desired: DesiredState,
  pub envelope: OperationEnvelope,
}

/// Build the desired state and choose the starting operations. Makes no
/// remote calls.
pub fn plan(event: &InboundEvent, config: &ReconcileConfig) -> Result<Plan, ControllerError> {
  let desired = DesiredState::build(&event.component_def, &event.component_name);
  let envelope = start(
    event.op,
    &desired,
    &event.prior_props(),
    event.pass_back_data.clone(),
    &config.region,
  )?;
  Ok(Plan { desired, envelope })
}

/// Run one invocation.
pub async fn reconcile<C: ControlPlane>(event: InboundEvent, client: &C, config: &ReconcileConfig) -> InvocationResult {
  info!(
    op = ?event.op,
    component = %event.component_name,
    resumed = event.pass_back_data.is_some(),
    "starting reconciliation"
  );

  let Plan { desired, envelope } = match plan(&event, config) {
    Ok(plan) => plan,
    Err(err) => {
      error!(error = %err, "invocation rejected");
      let mut envelope = OperationEnvelope::new();
      envelope.outputs.props = event.prior_props();
      envelope.add_error_log("Immutable Field Changed", json!({ "error": err.to_string() }));
      return InvocationResult::failed(envelope, err.to_string(), err.progress());
    }
  };

  let ctx = StepContext {
    client,
    desired: &desired,
    config,
  };
  execute(envelope, ctx).await
}
