//! The execution loop.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, error, info, warn};

use super::steps;
use super::types::{StepContext, StepOutcome};
use crate::client::ControlPlane;
use crate::envelope::{InvocationResult, OperationEnvelope, OperationKind};

/// Drain the pending operations of `envelope` in execution order.
///
/// Each kind is visited once. An operation may queue operations of later
/// kinds, which run in the same pass. The loop stops at the first retry
/// request or fatal outcome.
pub async fn execute<C: ControlPlane>(mut envelope: OperationEnvelope, ctx: StepContext<'_, C>) -> InvocationResult {
  debug!(pending = ?envelope.pending.kinds(), "executing operations");

  for kind in OperationKind::EXECUTION_ORDER {
    let Some(op) = envelope.pending.take(kind) else {
      continue;
    };

    debug!(op = %kind, "running operation");
    match steps::run(&op, &mut envelope, ctx).await {
      StepOutcome::Completed => {
        debug!(op = %kind, "operation completed");
      }
      StepOutcome::RetryAfter {
        delay,
        key,
        progress,
        message,
      } => {
        envelope.pending.push(op);
        envelope.progress = progress;
        let attempts = envelope.record_retry(&key);

        if attempts > ctx.config.max_retry_attempts {
          error!(op = %kind, key = %key, attempts, "retry budget exhausted");
          envelope.add_error_log("Retry Limit Reached", json!({ "key": key, "attempts": attempts }));
          let message = format!("{message} (gave up after {attempts} attempts)");
          return InvocationResult::failed(envelope, message, progress);
        }

        info!(op = %kind, attempt = attempts, delay = ?delay, "operation will be retried");
        return InvocationResult::retry(envelope, delay);
      }
      StepOutcome::Fatal { message, progress } => {
        error!(op = %kind, progress, error = %message, "operation failed");
        return InvocationResult::failed(envelope, message, progress);
      }
    }
  }

  if !envelope.pending.is_empty() {
    warn!(pending = ?envelope.pending.kinds(), "operations left after a full pass");
    return InvocationResult::retry(envelope, Duration::ZERO);
  }

  envelope.progress = 100;
  info!("reconciliation complete");
  InvocationResult::finished(envelope)
}
