//! Control plane boundary.
//!
//! The reconciler talks to the remote control plane only through the
//! [`ControlPlane`] trait. Each method is one request/response call; none of
//! them retry on their own. Failures are reported as [`ControlPlaneError`]
//! and classified by [`ControlPlaneError::class`].
//!
//! # Submodules
//!
//! - [`local`] - File-backed control plane used by the CLI and tests

mod error;
pub mod local;

pub use error::{ControlPlaneError, ErrorClass};

use std::collections::BTreeSet;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::desired::{AdvancedAttributes, CoreAttributes, CoreUpdate, HealthCheck, Matcher, Tags};

/// A target group as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
  pub arn: String,
  pub name: String,
  pub protocol: String,
  pub protocol_version: String,
  pub port: u16,
  pub vpc_id: Option<String>,
  pub target_type: String,
  pub ip_address_type: String,
  pub health_check: HealthCheck,
  pub matcher: Matcher,
  #[serde(default)]
  pub load_balancer_arns: Vec<String>,
}

/// Remote control plane operations used by the reconciler.
pub trait ControlPlane: Send + Sync {
  /// Look up a target group by name.
  fn describe_by_name(&self, name: &str) -> impl Future<Output = Result<TargetGroup, ControlPlaneError>> + Send;

  /// Advanced attributes currently applied to the target group.
  fn describe_advanced_attributes(
    &self,
    arn: &str,
  ) -> impl Future<Output = Result<AdvancedAttributes, ControlPlaneError>> + Send;

  /// Tags currently applied to the target group.
  fn describe_tags(&self, arn: &str) -> impl Future<Output = Result<Tags, ControlPlaneError>> + Send;

  /// Create a target group with the given core attributes and tags.
  fn create(
    &self,
    core: &CoreAttributes,
    tags: &Tags,
  ) -> impl Future<Output = Result<TargetGroup, ControlPlaneError>> + Send;

  /// Replace the mutable core attributes.
  fn modify_core(
    &self,
    arn: &str,
    update: &CoreUpdate,
  ) -> impl Future<Output = Result<TargetGroup, ControlPlaneError>> + Send;

  /// Set the given advanced attributes.
  fn modify_advanced_attributes(
    &self,
    arn: &str,
    attributes: &AdvancedAttributes,
  ) -> impl Future<Output = Result<(), ControlPlaneError>> + Send;

  /// Add or overwrite tags.
  fn add_tags(&self, arn: &str, tags: &Tags) -> impl Future<Output = Result<(), ControlPlaneError>> + Send;

  /// Remove tags by key.
  fn remove_tags(
    &self,
    arn: &str,
    keys: &BTreeSet<String>,
  ) -> impl Future<Output = Result<(), ControlPlaneError>> + Send;

  /// Delete the target group.
  fn delete(&self, arn: &str) -> impl Future<Output = Result<(), ControlPlaneError>> + Send;
}

/// Console URL for a target group.
pub fn console_link(region: &str, arn: &str) -> String {
  format!("https://{region}.console.aws.amazon.com/ec2/home?region={region}#TargetGroup:targetGroupArn={arn}")
}
