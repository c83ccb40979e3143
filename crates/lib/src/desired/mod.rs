//! Desired-state construction.
//!
//! Turns a raw [`ComponentDef`] into a [`DesiredState`]: core creation
//! attributes with their defaults applied, the advanced attributes the user
//! explicitly set, and the tag mapping.
//!
//! Advanced attributes and tags are never defaulted. An absent `tags` field
//! and an empty `tags` mapping mean different things to the diff engine.

mod types;

pub use types::*;

use tracing::debug;

use crate::attributes;

impl DesiredState {
  /// Build the desired state from a component definition.
  ///
  /// `component_name` is the harness-supplied name used when the definition
  /// does not carry its own `name`.
  pub fn build(def: &ComponentDef, component_name: &str) -> DesiredState {
    let defaults = HealthCheck::default();
    let health_check = HealthCheck {
      protocol: def
        .health_check_protocol
        .clone()
        .unwrap_or(defaults.protocol),
      port: def
        .health_check_port
        .as_ref()
        .map(AttributeValue::render)
        .unwrap_or(defaults.port),
      enabled: def.health_check_enabled.unwrap_or(defaults.enabled),
      path: def.health_check_path.clone().unwrap_or(defaults.path),
      interval_seconds: def
        .health_check_interval_seconds
        .unwrap_or(defaults.interval_seconds),
      timeout_seconds: def.health_check_timeout_seconds.unwrap_or(defaults.timeout_seconds),
      healthy_threshold_count: def
        .healthy_threshold_count
        .unwrap_or(defaults.healthy_threshold_count),
      unhealthy_threshold_count: def
        .unhealthy_threshold_count
        .unwrap_or(defaults.unhealthy_threshold_count),
    };

    let core = CoreAttributes {
      name: def.name.clone().unwrap_or_else(|| component_name.to_string()),
      protocol: def.protocol.clone().unwrap_or_else(|| DEFAULT_PROTOCOL.to_string()),
      protocol_version: def
        .protocol_version
        .clone()
        .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string()),
      port: def.port.unwrap_or(DEFAULT_PORT),
      vpc_id: def.vpc_id.clone(),
      health_check,
      matcher: def.matcher.clone().unwrap_or_default(),
      target_type: def.target_type.clone().unwrap_or_else(|| DEFAULT_TARGET_TYPE.to_string()),
      ip_address_type: def
        .ip_address_type
        .clone()
        .unwrap_or_else(|| DEFAULT_IP_ADDRESS_TYPE.to_string()),
    };

    let mut advanced = AdvancedAttributes::new();
    for (field, value) in &def.extra {
      let Some(attribute) = attributes::by_field(field) else {
        debug!(field = %field, "ignoring unknown definition field");
        continue;
      };
      match AttributeValue::from_json(value) {
        Some(value) => {
          advanced.insert(attribute.key.to_string(), value.render());
        }
        None => debug!(field = %field, "ignoring non-scalar advanced attribute"),
      }
    }

    let tags = def.tags.as_ref().map(|tags| {
      tags
        .iter()
        .map(|(key, value)| (key.clone(), value.render()))
        .collect::<Tags>()
    });

    DesiredState { core, advanced, tags }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn def_from(value: serde_json::Value) -> ComponentDef {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn empty_definition_gets_documented_defaults() {
    let desired = DesiredState::build(&ComponentDef::default(), "web-tg");

    let core = &desired.core;
    assert_eq!(core.name, "web-tg");
    assert_eq!(core.protocol, "HTTPS");
    assert_eq!(core.protocol_version, "HTTP1");
    assert_eq!(core.port, 443);
    assert_eq!(core.vpc_id, None);
    assert_eq!(core.health_check.protocol, "HTTPS");
    assert_eq!(core.health_check.port, "traffic-port");
    assert!(core.health_check.enabled);
    assert_eq!(core.health_check.path, "/");
    assert_eq!(core.health_check.interval_seconds, 30);
    assert_eq!(core.health_check.timeout_seconds, 10);
    assert_eq!(core.health_check.healthy_threshold_count, 5);
    assert_eq!(core.health_check.unhealthy_threshold_count, 2);
    assert_eq!(core.matcher.http_code.as_deref(), Some("200,403"));
    assert_eq!(core.target_type, "ip");
    assert_eq!(core.ip_address_type, "ipv4");

    assert!(desired.advanced.is_empty());
    assert!(desired.tags.is_none());
  }

  #[test]
  fn definition_name_wins_over_component_name() {
    let def = def_from(json!({ "name": "explicit" }));
    assert_eq!(DesiredState::build(&def, "fallback").core.name, "explicit");
  }

  #[test]
  fn explicit_false_is_respected() {
    let def = def_from(json!({ "health_check_enabled": false }));
    assert!(!DesiredState::build(&def, "tg").core.health_check.enabled);
  }

  #[test]
  fn numeric_health_check_port_is_rendered() {
    let def = def_from(json!({ "health_check_port": 8080 }));
    assert_eq!(DesiredState::build(&def, "tg").core.health_check.port, "8080");
  }

  #[test]
  fn matcher_accepts_wire_casing() {
    let def = def_from(json!({ "matcher": { "HttpCode": "200" } }));
    assert_eq!(DesiredState::build(&def, "tg").core.matcher.http_code.as_deref(), Some("200"));
  }

  #[test]
  fn advanced_attributes_are_mapped_to_dotted_keys() {
    let def = def_from(json!({
      "deregistration_delay_timeout_seconds": 60,
      "stickiness_enabled": true,
      "stickiness_type": "app_cookie",
      "preserve_client_ip_enabled": false,
    }));
    let desired = DesiredState::build(&def, "tg");

    assert_eq!(desired.advanced.len(), 4);
    assert_eq!(desired.advanced["deregistration_delay.timeout_seconds"], "60");
    assert_eq!(desired.advanced["stickiness.enabled"], "true");
    assert_eq!(desired.advanced["stickiness.type"], "app_cookie");
    assert_eq!(desired.advanced["preserve_client_ip.enabled"], "false");
  }

  #[test]
  fn null_and_unknown_fields_are_ignored() {
    let def = def_from(json!({
      "slow_start_duration_seconds": null,
      "something_else": "x",
      "stickiness_type": { "nested": true },
    }));
    assert!(DesiredState::build(&def, "tg").advanced.is_empty());
  }

  #[test]
  fn empty_tags_differ_from_absent_tags() {
    let with_empty = DesiredState::build(&def_from(json!({ "tags": {} })), "tg");
    assert_eq!(with_empty.tags, Some(Tags::new()));

    let without = DesiredState::build(&def_from(json!({})), "tg");
    assert_eq!(without.tags, None);
  }

  #[test]
  fn tag_values_are_rendered_as_strings() {
    let def = def_from(json!({ "tags": { "env": "prod", "tier": 2, "public": true } }));
    let tags = DesiredState::build(&def, "tg").tags.unwrap();
    assert_eq!(tags["env"], "prod");
    assert_eq!(tags["tier"], "2");
    assert_eq!(tags["public"], "true");
  }

  #[test]
  fn mutable_subset_carries_health_check_and_matcher() {
    let def = def_from(json!({ "health_check_path": "/health", "port": 8443 }));
    let desired = DesiredState::build(&def, "tg");
    let update = desired.core.mutable_subset();
    assert_eq!(update.health_check.path, "/health");
    assert_eq!(update.matcher, Matcher::default());
  }
}
