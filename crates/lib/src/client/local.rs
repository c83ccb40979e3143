//! Local, file-backed control plane.
//!
//! Keeps a table of target groups in memory and, when opened on a file,
//! mirrors every mutation to disk. It enforces the same rules the remote
//! control plane does for the calls the reconciler makes, so the CLI and
//! tests exercise realistic failures.
//!
//! # Storage Layout
//!
//! ```text
//! {state_dir}/
//! └── control-plane.json   # Table: version + target groups keyed by name
//! ```
//!
//! Every call is appended to an in-memory call log. Tests can inspect it and
//! queue failures for the next call of a given kind with [`LocalControlPlane::fail_next`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use super::{ControlPlane, ControlPlaneError, TargetGroup};
use crate::attributes::{documented_defaults, exposed_keys};
use crate::consts::{MAX_TAGS_PER_TARGET_GROUP, MAX_TARGET_GROUP_NAME_LEN};
use crate::desired::{AdvancedAttributes, CoreAttributes, CoreUpdate, HealthCheck, Tags};

/// Current version of the table file format.
pub const TABLE_VERSION: u32 = 1;

/// Account id used in generated ARNs.
const ACCOUNT_ID: &str = "000000000000";

/// Errors that can occur while loading or saving the table file.
#[derive(Debug, Error)]
pub enum LocalStoreError {
  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to read control plane table: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write control plane table: {0}")]
  Write(#[source] io::Error),

  #[error("failed to parse control plane table: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize control plane table: {0}")]
  Serialize(#[source] serde_json::Error),

  #[error("unsupported control plane table version: {0}")]
  UnsupportedVersion(u32),
}

/// A target group plus the attributes and tags attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTargetGroup {
  pub target_group: TargetGroup,
  pub attributes: AdvancedAttributes,
  #[serde(default)]
  pub tags: Tags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Table {
  version: u32,
  /// Maximum number of target groups; unlimited when absent.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  quota: Option<usize>,
  #[serde(default)]
  target_groups: BTreeMap<String, StoredTargetGroup>,
}

impl Default for Table {
  fn default() -> Self {
    Self {
      version: TABLE_VERSION,
      quota: None,
      target_groups: BTreeMap::new(),
    }
  }
}

impl Table {
  fn find_by_arn_mut(&mut self, arn: &str) -> Result<&mut StoredTargetGroup, ControlPlaneError> {
    self
      .target_groups
      .values_mut()
      .find(|stored| stored.target_group.arn == arn)
      .ok_or_else(|| ControlPlaneError::NotFound(arn.to_string()))
  }

  fn find_by_arn(&self, arn: &str) -> Result<&StoredTargetGroup, ControlPlaneError> {
    self
      .target_groups
      .values()
      .find(|stored| stored.target_group.arn == arn)
      .ok_or_else(|| ControlPlaneError::NotFound(arn.to_string()))
  }
}

/// Kind of control plane call, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CallKind {
  DescribeByName,
  DescribeAdvancedAttributes,
  DescribeTags,
  Create,
  ModifyCore,
  ModifyAdvancedAttributes,
  AddTags,
  RemoveTags,
  Delete,
}

/// A recorded control plane call and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  DescribeByName { name: String },
  DescribeAdvancedAttributes { arn: String },
  DescribeTags { arn: String },
  Create { name: String, tags: Tags },
  ModifyCore { arn: String, update: CoreUpdate },
  ModifyAdvancedAttributes { arn: String, attributes: AdvancedAttributes },
  AddTags { arn: String, tags: Tags },
  RemoveTags { arn: String, keys: BTreeSet<String> },
  Delete { arn: String },
}

impl Call {
  pub fn kind(&self) -> CallKind {
    match self {
      Call::DescribeByName { .. } => CallKind::DescribeByName,
      Call::DescribeAdvancedAttributes { .. } => CallKind::DescribeAdvancedAttributes,
      Call::DescribeTags { .. } => CallKind::DescribeTags,
      Call::Create { .. } => CallKind::Create,
      Call::ModifyCore { .. } => CallKind::ModifyCore,
      Call::ModifyAdvancedAttributes { .. } => CallKind::ModifyAdvancedAttributes,
      Call::AddTags { .. } => CallKind::AddTags,
      Call::RemoveTags { .. } => CallKind::RemoveTags,
      Call::Delete { .. } => CallKind::Delete,
    }
  }
}

#[derive(Debug, Default)]
struct Inner {
  table: Table,
  calls: Vec<Call>,
  failures: BTreeMap<CallKind, VecDeque<ControlPlaneError>>,
}

/// In-process control plane, optionally persisted to a JSON file.
#[derive(Debug)]
pub struct LocalControlPlane {
  region: String,
  path: Option<PathBuf>,
  inner: Mutex<Inner>,
}

impl LocalControlPlane {
  /// A control plane that lives only as long as the value.
  pub fn in_memory(region: impl Into<String>) -> Self {
    Self {
      region: region.into(),
      path: None,
      inner: Mutex::new(Inner::default()),
    }
  }

  /// Open the table at `path`. A missing file is an empty table.
  pub fn open(path: impl Into<PathBuf>, region: impl Into<String>) -> Result<Self, LocalStoreError> {
    let path = path.into();
    let table = load_table(&path)?;
    debug!(path = %path.display(), count = table.target_groups.len(), "opened control plane table");
    Ok(Self {
      region: region.into(),
      path: Some(path),
      inner: Mutex::new(Inner {
        table,
        ..Inner::default()
      }),
    })
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Every call made so far, oldest first.
  pub fn calls(&self) -> Vec<Call> {
    self.lock().calls.clone()
  }

  pub fn call_count(&self) -> usize {
    self.lock().calls.len()
  }

  pub fn count_of(&self, kind: CallKind) -> usize {
    self.lock().calls.iter().filter(|c| c.kind() == kind).count()
  }

  /// Make the next call of `kind` fail with `error`. Queued failures are
  /// consumed in order.
  pub fn fail_next(&self, kind: CallKind, error: ControlPlaneError) {
    self.lock().failures.entry(kind).or_default().push_back(error);
  }

  /// Limit the number of target groups the table accepts.
  pub fn set_quota(&self, quota: Option<usize>) -> Result<(), LocalStoreError> {
    let mut inner = self.lock();
    inner.table.quota = quota;
    self.save(&inner.table)
  }

  pub fn target_group(&self, name: &str) -> Option<StoredTargetGroup> {
    self.lock().table.target_groups.get(name).cloned()
  }

  pub fn list(&self) -> Vec<StoredTargetGroup> {
    self.lock().table.target_groups.values().cloned().collect()
  }

  /// Create a target group without recording a call.
  pub fn seed(&self, core: &CoreAttributes, tags: &Tags) -> Result<TargetGroup, ControlPlaneError> {
    let mut inner = self.lock();
    let created = create_in(&mut inner.table, &self.region, core, tags)?;
    self.persist(&inner.table)?;
    Ok(created)
  }

  /// Overwrite advanced attributes directly, bypassing validation.
  pub fn seed_attributes(&self, name: &str, attributes: &AdvancedAttributes) -> bool {
    let mut inner = self.lock();
    let Some(stored) = inner.table.target_groups.get_mut(name) else {
      return false;
    };
    stored.attributes.extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
    self.persist(&inner.table).is_ok()
  }

  /// Attach a load balancer, which blocks deletion.
  pub fn attach_load_balancer(&self, name: &str, load_balancer_arn: &str) -> Result<(), ControlPlaneError> {
    let mut inner = self.lock();
    let stored = inner
      .table
      .target_groups
      .get_mut(name)
      .ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))?;
    stored.target_group.load_balancer_arns.push(load_balancer_arn.to_string());
    self.persist(&inner.table)
  }

  /// Record `call` and pop an injected failure for its kind.
  fn begin(&self, inner: &mut Inner, call: Call) -> Result<(), ControlPlaneError> {
    let kind = call.kind();
    debug!(call = ?call, "control plane call");
    inner.calls.push(call);
    match inner.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
      Some(error) => {
        debug!(kind = ?kind, error = %error, "injected failure");
        Err(error)
      }
      None => Ok(()),
    }
  }

  fn save(&self, table: &Table) -> Result<(), LocalStoreError> {
    let Some(path) = &self.path else {
      return Ok(());
    };
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent).map_err(LocalStoreError::CreateDir)?;
    }

    let temp_path = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(table).map_err(LocalStoreError::Serialize)?;
    fs::write(&temp_path, &content).map_err(LocalStoreError::Write)?;
    fs::rename(&temp_path, path).map_err(LocalStoreError::Write)?;
    Ok(())
  }

  /// Save after a mutation. A failed write looks like a transport failure.
  fn persist(&self, table: &Table) -> Result<(), ControlPlaneError> {
    self
      .save(table)
      .map_err(|e| ControlPlaneError::Transient(e.to_string()))
  }
}

fn load_table(path: &Path) -> Result<Table, LocalStoreError> {
  let content = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Table::default()),
    Err(e) => return Err(LocalStoreError::Read(e)),
  };

  let table: Table = serde_json::from_str(&content).map_err(LocalStoreError::Parse)?;
  if table.version != TABLE_VERSION {
    return Err(LocalStoreError::UnsupportedVersion(table.version));
  }
  Ok(table)
}

/// Stable ARN for a target group name in a region.
pub fn target_group_arn(region: &str, name: &str) -> String {
  let digest = Sha256::digest(format!("{region}/{name}").as_bytes());
  let id = hex::encode(digest);
  format!(
    "arn:aws:elasticloadbalancing:{region}:{ACCOUNT_ID}:targetgroup/{name}/{}",
    &id[..16]
  )
}

fn validate_name(name: &str) -> Result<(), ControlPlaneError> {
  if name.is_empty() || name.len() > MAX_TARGET_GROUP_NAME_LEN {
    return Err(ControlPlaneError::InvalidConfiguration(format!(
      "target group name must be 1 to {MAX_TARGET_GROUP_NAME_LEN} characters, got {}",
      name.len()
    )));
  }
  if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
    return Err(ControlPlaneError::InvalidConfiguration(format!(
      "target group name {name:?} may only contain alphanumeric characters and hyphens"
    )));
  }
  if name.starts_with('-') || name.ends_with('-') {
    return Err(ControlPlaneError::InvalidConfiguration(format!(
      "target group name {name:?} cannot begin or end with a hyphen"
    )));
  }
  Ok(())
}

fn validate_health_check(health_check: &HealthCheck) -> Result<(), ControlPlaneError> {
  if health_check.timeout_seconds >= health_check.interval_seconds {
    return Err(ControlPlaneError::InvalidConfiguration(format!(
      "health check timeout ({}s) must be smaller than the interval ({}s)",
      health_check.timeout_seconds, health_check.interval_seconds
    )));
  }
  Ok(())
}

fn validate_tag_count(count: usize) -> Result<(), ControlPlaneError> {
  if count > MAX_TAGS_PER_TARGET_GROUP {
    return Err(ControlPlaneError::TooManyTags(format!(
      "{count} tags exceeds the limit of {MAX_TAGS_PER_TARGET_GROUP}"
    )));
  }
  Ok(())
}

fn create_in(
  table: &mut Table,
  region: &str,
  core: &CoreAttributes,
  tags: &Tags,
) -> Result<TargetGroup, ControlPlaneError> {
  validate_name(&core.name)?;
  validate_health_check(&core.health_check)?;
  validate_tag_count(tags.len())?;

  if table.target_groups.contains_key(&core.name) {
    return Err(ControlPlaneError::AlreadyExists(core.name.clone()));
  }
  if let Some(quota) = table.quota
    && table.target_groups.len() >= quota
  {
    return Err(ControlPlaneError::QuotaExceeded(format!(
      "the limit of {quota} target groups is reached"
    )));
  }

  let target_group = TargetGroup {
    arn: target_group_arn(region, &core.name),
    name: core.name.clone(),
    protocol: core.protocol.clone(),
    protocol_version: core.protocol_version.clone(),
    port: core.port,
    vpc_id: core.vpc_id.clone(),
    target_type: core.target_type.clone(),
    ip_address_type: core.ip_address_type.clone(),
    health_check: core.health_check.clone(),
    matcher: core.matcher.clone(),
    load_balancer_arns: Vec::new(),
  };

  let defaults = documented_defaults();
  let attributes = exposed_keys(&core.protocol, &core.target_type)
    .into_iter()
    .filter_map(|key| defaults.get(key).map(|value| (key.to_string(), value.clone())))
    .collect();

  table.target_groups.insert(
    core.name.clone(),
    StoredTargetGroup {
      target_group: target_group.clone(),
      attributes,
      tags: tags.clone(),
    },
  );
  Ok(target_group)
}

impl ControlPlane for LocalControlPlane {
  async fn describe_by_name(&self, name: &str) -> Result<TargetGroup, ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::DescribeByName {
        name: name.to_string(),
      },
    )?;
    inner
      .table
      .target_groups
      .get(name)
      .map(|stored| stored.target_group.clone())
      .ok_or_else(|| ControlPlaneError::NotFound(name.to_string()))
  }

  async fn describe_advanced_attributes(&self, arn: &str) -> Result<AdvancedAttributes, ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(&mut inner, Call::DescribeAdvancedAttributes { arn: arn.to_string() })?;
    Ok(inner.table.find_by_arn(arn)?.attributes.clone())
  }

  async fn describe_tags(&self, arn: &str) -> Result<Tags, ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(&mut inner, Call::DescribeTags { arn: arn.to_string() })?;
    Ok(inner.table.find_by_arn(arn)?.tags.clone())
  }

  async fn create(&self, core: &CoreAttributes, tags: &Tags) -> Result<TargetGroup, ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::Create {
        name: core.name.clone(),
        tags: tags.clone(),
      },
    )?;
    let created = create_in(&mut inner.table, &self.region, core, tags)?;
    self.persist(&inner.table)?;
    info!(name = %created.name, arn = %created.arn, "local control plane created target group");
    Ok(created)
  }

  async fn modify_core(&self, arn: &str, update: &CoreUpdate) -> Result<TargetGroup, ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::ModifyCore {
        arn: arn.to_string(),
        update: update.clone(),
      },
    )?;
    validate_health_check(&update.health_check)?;
    let stored = inner.table.find_by_arn_mut(arn)?;
    stored.target_group.health_check = update.health_check.clone();
    stored.target_group.matcher = update.matcher.clone();
    let modified = stored.target_group.clone();
    self.persist(&inner.table)?;
    Ok(modified)
  }

  async fn modify_advanced_attributes(
    &self,
    arn: &str,
    attributes: &AdvancedAttributes,
  ) -> Result<(), ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::ModifyAdvancedAttributes {
        arn: arn.to_string(),
        attributes: attributes.clone(),
      },
    )?;
    let stored = inner.table.find_by_arn_mut(arn)?;
    if let Some(key) = attributes.keys().find(|key| !stored.attributes.contains_key(*key)) {
      return Err(ControlPlaneError::InvalidConfiguration(format!(
        "attribute {key} is not supported by a {} target group with {} targets",
        stored.target_group.protocol, stored.target_group.target_type
      )));
    }
    stored
      .attributes
      .extend(attributes.iter().map(|(k, v)| (k.clone(), v.clone())));
    self.persist(&inner.table)
  }

  async fn add_tags(&self, arn: &str, tags: &Tags) -> Result<(), ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::AddTags {
        arn: arn.to_string(),
        tags: tags.clone(),
      },
    )?;
    let stored = inner.table.find_by_arn_mut(arn)?;
    let mut merged = stored.tags.clone();
    merged.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
    validate_tag_count(merged.len())?;
    stored.tags = merged;
    self.persist(&inner.table)
  }

  async fn remove_tags(&self, arn: &str, keys: &BTreeSet<String>) -> Result<(), ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(
      &mut inner,
      Call::RemoveTags {
        arn: arn.to_string(),
        keys: keys.clone(),
      },
    )?;
    let stored = inner.table.find_by_arn_mut(arn)?;
    stored.tags.retain(|key, _| !keys.contains(key));
    self.persist(&inner.table)
  }

  async fn delete(&self, arn: &str) -> Result<(), ControlPlaneError> {
    let mut inner = self.lock();
    self.begin(&mut inner, Call::Delete { arn: arn.to_string() })?;
    let stored = inner.table.find_by_arn(arn)?;
    if !stored.target_group.load_balancer_arns.is_empty() {
      return Err(ControlPlaneError::ResourceInUse(format!(
        "target group {} is currently in use by load balancer(s) {}",
        stored.target_group.name,
        stored.target_group.load_balancer_arns.join(", ")
      )));
    }
    let name = stored.target_group.name.clone();
    inner.table.target_groups.remove(&name);
    self.persist(&inner.table)?;
    info!(name = %name, arn = %arn, "local control plane deleted target group");
    Ok(())
  }
}
