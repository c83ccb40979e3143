//! One function per operation kind.
//!
//! Each step owns the remote calls for its operation and turns every failure
//! into a [`StepOutcome`]. Nothing here returns a raw control plane error.

use std::collections::BTreeSet;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::controller::{ControllerError, changed_immutable_fields};
use super::types::{StepContext, StepOutcome};
use crate::attributes::documented_defaults;
use crate::client::{ControlPlane, ControlPlaneError, ErrorClass, TargetGroup, console_link};
use crate::config::ReconcileConfig;
use crate::desired::Tags;
use crate::diff::{diff_advanced_attributes, diff_tags};
use crate::envelope::{Operation, OperationEnvelope, OperationKind, Props};

/// Run one operation against the envelope.
pub(super) async fn run<C: ControlPlane>(
  op: &Operation,
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  match op {
    Operation::FetchLiveState => fetch_live_state(envelope, ctx).await,
    Operation::CreateResource => create_resource(envelope, ctx).await,
    Operation::UpdateCoreAttributes => update_core_attributes(envelope, ctx).await,
    Operation::UpdateAdvancedAttributes => {
      write_advanced_attributes(OperationKind::UpdateAdvancedAttributes, envelope, ctx).await
    }
    Operation::ResetAdvancedAttributes => {
      write_advanced_attributes(OperationKind::ResetAdvancedAttributes, envelope, ctx).await
    }
    Operation::RemoveTags { keys } => remove_tags(keys, envelope, ctx).await,
    Operation::AddTags { tags } => add_tags(tags, envelope, ctx).await,
    Operation::DeleteResource => delete_resource(envelope, ctx).await,
  }
}

async fn fetch_live_state<C: ControlPlane>(envelope: &mut OperationEnvelope, ctx: StepContext<'_, C>) -> StepOutcome {
  let kind = OperationKind::FetchLiveState;
  let name = &ctx.desired.core.name;

  match ctx.client.describe_by_name(name).await {
    Ok(tg) => {
      info!(name = %name, arn = %tg.arn, "found existing target group");
      envelope.add_log("Got Target Group", serde_json::to_value(&tg).unwrap_or_default());
      adopt(kind, &tg, envelope, ctx).await
    }
    Err(err) if err.is_not_found() => {
      info!(name = %name, "target group does not exist");
      envelope.add_log("Target Group Does Not Exist", json!({ "name": name }));
      envelope.enqueue(Operation::CreateResource);
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Get Target Group Error", &err, envelope, ctx.config),
  }
}

async fn create_resource<C: ControlPlane>(envelope: &mut OperationEnvelope, ctx: StepContext<'_, C>) -> StepOutcome {
  let kind = OperationKind::CreateResource;
  let core = &ctx.desired.core;
  let tags = ctx.desired.tags.clone().unwrap_or_default();

  match ctx.client.create(core, &tags).await {
    Ok(tg) => {
      info!(name = %tg.name, arn = %tg.arn, "created target group");
      envelope.add_log("Created Target Group", serde_json::to_value(&tg).unwrap_or_default());
      record_identity(&tg, envelope, ctx.config);
      plan_followups(kind, &tg.arn, envelope, ctx).await
    }
    // Created by an earlier attempt whose response was lost, or by someone
    // else. Either way the resource is there now.
    Err(ControlPlaneError::AlreadyExists(_)) => {
      info!(name = %core.name, "target group already exists, adopting it");
      match ctx.client.describe_by_name(&core.name).await {
        Ok(tg) => {
          envelope.add_log("Adopted Existing Target Group", json!({ "name": tg.name, "arn": tg.arn }));
          adopt(kind, &tg, envelope, ctx).await
        }
        Err(err) if err.is_not_found() => {
          warn!(name = %core.name, "target group vanished after create reported it exists");
          StepOutcome::RetryAfter {
            delay: ctx.config.retry_delay,
            key: format!("{kind}:adopt"),
            progress: kind.checkpoint(),
            message: format!("Target group {} exists but could not be found", core.name),
          }
        }
        Err(err) => failure(kind, "Get Target Group Error", &err, envelope, ctx.config),
      }
    }
    // Create assumes nothing exists, so absence here is never benign.
    Err(err) if err.is_not_found() => {
      error!(name = %core.name, error = %err, "create reported the target group missing");
      envelope.add_error_log("Error Creating Target Group", json!({ "error": err.to_string() }));
      StepOutcome::Fatal {
        message: format!("Error Creating Target Group: {err}"),
        progress: kind.checkpoint(),
      }
    }
    Err(err) => failure(kind, "Error Creating Target Group", &err, envelope, ctx.config),
  }
}

async fn update_core_attributes<C: ControlPlane>(
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  let kind = OperationKind::UpdateCoreAttributes;
  let arn = match require_arn(kind, envelope) {
    Ok(arn) => arn,
    Err(outcome) => return outcome,
  };

  let update = ctx.desired.core.mutable_subset();
  debug!(arn = %arn, update = ?update, "modifying target group");
  match ctx.client.modify_core(&arn, &update).await {
    Ok(tg) => {
      info!(arn = %arn, "modified target group");
      envelope.add_log("Modified Target Group", serde_json::to_value(&update).unwrap_or_default());
      record_identity(&tg, envelope, ctx.config);
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Error Updating Target Group", &err, envelope, ctx.config),
  }
}

/// Shared by the update and reset operations. Both write the mapping planned
/// into `state.advanced_update`.
async fn write_advanced_attributes<C: ControlPlane>(
  kind: OperationKind,
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  let arn = match require_arn(kind, envelope) {
    Ok(arn) => arn,
    Err(outcome) => return outcome,
  };

  let Some(update) = envelope.state.advanced_update.clone() else {
    warn!(op = %kind, "no advanced attribute update planned, skipping");
    return StepOutcome::Completed;
  };
  if update.is_empty() {
    debug!(op = %kind, "advanced attribute update is empty");
    return StepOutcome::Completed;
  }

  match ctx.client.modify_advanced_attributes(&arn, &update).await {
    Ok(()) => {
      info!(arn = %arn, count = update.len(), op = %kind, "modified advanced attributes");
      envelope.add_log("Modified Target Group Attributes", json!(update));
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Error Updating Target Group Attributes", &err, envelope, ctx.config),
  }
}

async fn remove_tags<C: ControlPlane>(
  keys: &BTreeSet<String>,
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  let kind = OperationKind::RemoveTags;
  if keys.is_empty() {
    debug!("no tags to remove");
    return StepOutcome::Completed;
  }
  let arn = match require_arn(kind, envelope) {
    Ok(arn) => arn,
    Err(outcome) => return outcome,
  };

  match ctx.client.remove_tags(&arn, keys).await {
    Ok(()) => {
      info!(arn = %arn, count = keys.len(), "removed tags");
      envelope.add_log("Removed Tags", json!({ "keys": keys }));
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Error Removing Target Group Tags", &err, envelope, ctx.config),
  }
}

async fn add_tags<C: ControlPlane>(tags: &Tags, envelope: &mut OperationEnvelope, ctx: StepContext<'_, C>) -> StepOutcome {
  let kind = OperationKind::AddTags;
  if tags.is_empty() {
    debug!("no tags to add");
    return StepOutcome::Completed;
  }
  let arn = match require_arn(kind, envelope) {
    Ok(arn) => arn,
    Err(outcome) => return outcome,
  };

  match ctx.client.add_tags(&arn, tags).await {
    Ok(()) => {
      info!(arn = %arn, count = tags.len(), "added tags");
      envelope.add_log("Tags Added", json!(tags));
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Error Adding Tags", &err, envelope, ctx.config),
  }
}

async fn delete_resource<C: ControlPlane>(envelope: &mut OperationEnvelope, ctx: StepContext<'_, C>) -> StepOutcome {
  let kind = OperationKind::DeleteResource;
  let Some(arn) = envelope.state.target_group_arn.clone() else {
    info!("no target group arn recorded, nothing to delete");
    envelope.add_log("Nothing to Delete", serde_json::Value::Null);
    return StepOutcome::Completed;
  };

  match ctx.client.delete(&arn).await {
    Ok(()) => {
      info!(arn = %arn, "deleted target group");
      envelope.add_log("Target Group Deleted", json!({ "target_group_arn": arn }));
      envelope.clear_identity();
      StepOutcome::Completed
    }
    Err(err) if err.is_not_found() => {
      warn!(arn = %arn, "target group already gone");
      envelope.add_log("Target Group Not Found", json!({ "arn": arn }));
      envelope.clear_identity();
      StepOutcome::Completed
    }
    Err(err) => failure(kind, "Error Deleting Target Group", &err, envelope, ctx.config),
  }
}

/// Take over a target group found by name: check that its immutable fields
/// match, record its identity, and plan the follow-up writes.
async fn adopt<C: ControlPlane>(
  kind: OperationKind,
  tg: &TargetGroup,
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  let fields = changed_immutable_fields(&Props::from(tg), ctx.desired);
  if !fields.is_empty() {
    let err = ControllerError::ImmutableFieldChanged { fields };
    error!(arn = %tg.arn, error = %err, "existing target group does not match");
    envelope.add_error_log("Immutable Field Changed", json!({ "arn": tg.arn, "error": err.to_string() }));
    return StepOutcome::Fatal {
      message: err.to_string(),
      progress: kind.checkpoint(),
    };
  }

  record_identity(tg, envelope, ctx.config);

  let desired_update = ctx.desired.core.mutable_subset();
  if tg.health_check != desired_update.health_check || tg.matcher != desired_update.matcher {
    envelope.enqueue(Operation::UpdateCoreAttributes);
  } else {
    debug!(arn = %tg.arn, "core attributes already up to date");
  }

  plan_followups(kind, &tg.arn, envelope, ctx).await
}

/// Fetch live advanced attributes and tags (or reuse the copies cached by an
/// earlier attempt) and enqueue the writes that bring them to the desired
/// state.
async fn plan_followups<C: ControlPlane>(
  kind: OperationKind,
  arn: &str,
  envelope: &mut OperationEnvelope,
  ctx: StepContext<'_, C>,
) -> StepOutcome {
  let live_attributes = match envelope.state.live_advanced_attributes.clone() {
    Some(cached) => Some(cached),
    None => match ctx.client.describe_advanced_attributes(arn).await {
      Ok(attributes) => {
        envelope.add_log("Got Target Group Attributes", json!(attributes));
        envelope.state.live_advanced_attributes = Some(attributes.clone());
        Some(attributes)
      }
      Err(err) if err.is_not_found() => {
        warn!(arn = %arn, "target group not found while reading attributes");
        envelope.add_log("Target Group Not Found", json!({ "arn": arn }));
        None
      }
      Err(err) => return failure(kind, "Error Getting Target Group Attributes", &err, envelope, ctx.config),
    },
  };

  if let Some(live) = live_attributes {
    let update = diff_advanced_attributes(&ctx.desired.advanced, live.keys(), documented_defaults());
    debug!(update = ?update, "planned advanced attribute update");
    envelope.state.advanced_update = Some(update);
    if ctx.desired.advanced.is_empty() {
      envelope.enqueue(Operation::ResetAdvancedAttributes);
    } else {
      envelope.enqueue(Operation::UpdateAdvancedAttributes);
    }
  }

  let live_tags = match envelope.state.live_tags.clone() {
    Some(cached) => Some(cached),
    None => match ctx.client.describe_tags(arn).await {
      Ok(tags) => {
        envelope.add_log("Got Tags", json!({ "count": tags.len() }));
        envelope.state.live_tags = Some(tags.clone());
        Some(tags)
      }
      Err(err) if err.is_not_found() => {
        warn!(arn = %arn, "target group not found while reading tags");
        envelope.add_log("Target Group Not Found", json!({ "arn": arn }));
        None
      }
      Err(err) => return failure(kind, "Error Getting Tags", &err, envelope, ctx.config),
    },
  };

  if let Some(live) = live_tags {
    let diff = diff_tags(ctx.desired.tags.as_ref(), &live);
    debug!(remove = ?diff.to_remove, add = ?diff.to_add, full_clear = diff.full_clear, "planned tag changes");
    if diff.full_clear || !diff.to_remove.is_empty() {
      envelope.enqueue(Operation::RemoveTags { keys: diff.to_remove });
    }
    if !diff.to_add.is_empty() {
      envelope.enqueue(Operation::AddTags { tags: diff.to_add });
    }
  }

  StepOutcome::Completed
}

/// Record the target group identity in state, props and links.
fn record_identity(tg: &TargetGroup, envelope: &mut OperationEnvelope, config: &ReconcileConfig) {
  let region = envelope
    .state
    .region
    .get_or_insert_with(|| config.region.clone())
    .clone();
  envelope.state.target_group_arn = Some(tg.arn.clone());
  envelope.outputs.props = Props::from(tg);
  envelope.set_console_link(console_link(&region, &tg.arn));
}

fn require_arn(kind: OperationKind, envelope: &mut OperationEnvelope) -> Result<String, StepOutcome> {
  match &envelope.state.target_group_arn {
    Some(arn) => Ok(arn.clone()),
    None => {
      error!(op = %kind, "no target group arn recorded");
      let message = format!("Cannot run {kind}: no target group arn recorded");
      envelope.add_error_log("Missing Target Group", json!({ "op": kind.as_str() }));
      Err(StepOutcome::Fatal {
        message,
        progress: kind.checkpoint(),
      })
    }
  }
}

/// Translate a failed call into an outcome.
fn failure(
  kind: OperationKind,
  title: &str,
  err: &ControlPlaneError,
  envelope: &mut OperationEnvelope,
  config: &ReconcileConfig,
) -> StepOutcome {
  let progress = kind.checkpoint();
  match err.class() {
    ErrorClass::Transient => {
      warn!(op = %kind, error = %err, "transient control plane error");
      envelope.add_error_log(title, json!({ "error": err.to_string() }));
      StepOutcome::RetryAfter {
        delay: config.retry_delay,
        key: format!("{kind}:transient"),
        progress,
        message: format!("{title}: {err}"),
      }
    }
    ErrorClass::Absent => {
      warn!(op = %kind, error = %err, "target group not found, continuing");
      envelope.add_log(
        "Target Group Not Found",
        json!({ "arn": envelope.state.target_group_arn, "error": err.to_string() }),
      );
      StepOutcome::Completed
    }
    ErrorClass::Invalid => {
      let message = err.user_message();
      error!(op = %kind, error = %err, "control plane rejected the request");
      envelope.add_error_log(title, json!({ "error": err.to_string() }));
      StepOutcome::Fatal { message, progress }
    }
    ErrorClass::InUse => {
      let message = format!("{title}: target group is attached to a load balancer. Detach it first. ({err})");
      error!(op = %kind, error = %err, "target group is in use");
      envelope.add_error_log(title, json!({ "error": err.to_string() }));
      StepOutcome::Fatal { message, progress }
    }
  }
}
