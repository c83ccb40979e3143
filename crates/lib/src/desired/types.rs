use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tag mapping. Keys are unique, values are strings.
pub type Tags = BTreeMap<String, String>;

/// Advanced attribute mapping (dotted key -> wire value).
pub type AdvancedAttributes = BTreeMap<String, String>;

pub const DEFAULT_PROTOCOL: &str = "HTTPS";
pub const DEFAULT_PROTOCOL_VERSION: &str = "HTTP1";
pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_HEALTH_CHECK_PROTOCOL: &str = "HTTPS";
pub const DEFAULT_HEALTH_CHECK_PORT: &str = "traffic-port";
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";
pub const DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS: u32 = 30;
pub const DEFAULT_HEALTH_CHECK_TIMEOUT_SECONDS: u32 = 10;
pub const DEFAULT_HEALTHY_THRESHOLD_COUNT: u32 = 5;
pub const DEFAULT_UNHEALTHY_THRESHOLD_COUNT: u32 = 2;
pub const DEFAULT_MATCHER_HTTP_CODE: &str = "200,403";
pub const DEFAULT_TARGET_TYPE: &str = "ip";
pub const DEFAULT_IP_ADDRESS_TYPE: &str = "ipv4";

/// A scalar value as it appears in a component definition.
///
/// Definitions are written by hand, so `port = 8080` and `port = "8080"` are
/// both accepted and rendered to the same wire string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
  Bool(bool),
  Number(serde_json::Number),
  Text(String),
}

impl AttributeValue {
  /// Convert a JSON value. Returns `None` for null, arrays and objects.
  pub fn from_json(value: &serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::Bool(b) => Some(AttributeValue::Bool(*b)),
      serde_json::Value::Number(n) => Some(AttributeValue::Number(n.clone())),
      serde_json::Value::String(s) => Some(AttributeValue::Text(s.clone())),
      _ => None,
    }
  }

  /// Wire form. Booleans are always lowercase.
  pub fn render(&self) -> String {
    match self {
      AttributeValue::Bool(b) => b.to_string(),
      AttributeValue::Number(n) => n.to_string(),
      AttributeValue::Text(s) => s.clone(),
    }
  }
}

/// Raw user-supplied target group definition.
///
/// Every field is optional. Advanced attributes are flat snake_case fields
/// (see [`crate::attributes::ADVANCED_ATTRIBUTES`]) collected into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentDef {
  pub name: Option<String>,
  pub vpc_id: Option<String>,
  pub protocol: Option<String>,
  pub protocol_version: Option<String>,
  pub port: Option<u16>,
  pub health_check_protocol: Option<String>,
  pub health_check_port: Option<AttributeValue>,
  pub health_check_enabled: Option<bool>,
  pub health_check_path: Option<String>,
  pub health_check_interval_seconds: Option<u32>,
  pub health_check_timeout_seconds: Option<u32>,
  pub healthy_threshold_count: Option<u32>,
  pub unhealthy_threshold_count: Option<u32>,
  pub matcher: Option<Matcher>,
  pub target_type: Option<String>,
  pub ip_address_type: Option<String>,
  pub tags: Option<BTreeMap<String, AttributeValue>>,

  /// Every other field, including advanced attributes.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// Success codes a health check accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
  #[serde(default, alias = "HttpCode", skip_serializing_if = "Option::is_none")]
  pub http_code: Option<String>,
  #[serde(default, alias = "GrpcCode", skip_serializing_if = "Option::is_none")]
  pub grpc_code: Option<String>,
}

impl Default for Matcher {
  fn default() -> Self {
    Self {
      http_code: Some(DEFAULT_MATCHER_HTTP_CODE.to_string()),
      grpc_code: None,
    }
  }
}

/// Health check settings. All of these stay mutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
  pub protocol: String,
  pub port: String,
  pub enabled: bool,
  pub path: String,
  pub interval_seconds: u32,
  /// Must be lower than `interval_seconds`; the control plane validates it.
  pub timeout_seconds: u32,
  pub healthy_threshold_count: u32,
  pub unhealthy_threshold_count: u32,
}

impl Default for HealthCheck {
  fn default() -> Self {
    Self {
      protocol: DEFAULT_HEALTH_CHECK_PROTOCOL.to_string(),
      port: DEFAULT_HEALTH_CHECK_PORT.to_string(),
      enabled: true,
      path: DEFAULT_HEALTH_CHECK_PATH.to_string(),
      interval_seconds: DEFAULT_HEALTH_CHECK_INTERVAL_SECONDS,
      timeout_seconds: DEFAULT_HEALTH_CHECK_TIMEOUT_SECONDS,
      healthy_threshold_count: DEFAULT_HEALTHY_THRESHOLD_COUNT,
      unhealthy_threshold_count: DEFAULT_UNHEALTHY_THRESHOLD_COUNT,
    }
  }
}

/// Attributes accepted when a target group is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreAttributes {
  pub name: String,
  pub protocol: String,
  pub protocol_version: String,
  pub port: u16,
  pub vpc_id: Option<String>,
  pub health_check: HealthCheck,
  pub matcher: Matcher,
  pub target_type: String,
  pub ip_address_type: String,
}

impl CoreAttributes {
  /// The subset of core attributes that can be modified in place.
  pub fn mutable_subset(&self) -> CoreUpdate {
    CoreUpdate {
      health_check: self.health_check.clone(),
      matcher: self.matcher.clone(),
    }
  }
}

/// Full replacement of the mutable core attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreUpdate {
  pub health_check: HealthCheck,
  pub matcher: Matcher,
}

/// The desired configuration for one invocation. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
  pub core: CoreAttributes,

  /// Only the attributes the user explicitly set.
  pub advanced: AdvancedAttributes,

  /// `None` when the definition has no `tags` field at all.
  pub tags: Option<Tags>,
}
