use std::time::Duration;

use crate::config::ReconcileConfig;
use crate::desired::DesiredState;

/// What happened when one operation ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
  Completed,

  /// Run the same operation again after `delay`. Attempts are counted
  /// against `key`.
  RetryAfter {
    delay: Duration,
    key: String,
    progress: u8,
    message: String,
  },

  /// Stop the invocation. Nothing already applied is rolled back.
  Fatal { message: String, progress: u8 },
}

/// Everything an operation may read besides the envelope.
#[derive(Debug)]
pub struct StepContext<'a, C> {
  pub client: &'a C,
  pub desired: &'a DesiredState,
  pub config: &'a ReconcileConfig,
}

impl<C> Clone for StepContext<'_, C> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<C> Copy for StepContext<'_, C> {}
