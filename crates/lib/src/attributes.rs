//! Advanced target group attributes.
//!
//! Advanced attributes can only be set after a target group exists. Each one
//! is addressed by a dotted key (e.g. `stickiness.lb_cookie.duration_seconds`)
//! and carries a string value on the wire.
//!
//! This module holds three static tables:
//!
//! - [`ADVANCED_ATTRIBUTES`]: every known key, the flat definition field it is
//!   read from, and the control plane's documented default.
//! - [`documented_defaults`]: the same defaults as a lookup map, used to reset
//!   attributes the user no longer sets.
//! - [`exposed_keys`]: which keys a target group exposes for a given protocol
//!   and target type.
//!
//! # Compatibility matrix
//!
//! | family | protocols | extra keys |
//! |---|---|---|
//! | all | any | `deregistration_delay.timeout_seconds`, `stickiness.enabled`, `stickiness.type` |
//! | application | HTTP, HTTPS | cross zone, target group health, and for `instance`/`ip` targets the algorithm, slow start and cookie keys |
//! | network | TCP, TLS, UDP, TCP_UDP | cross zone, target group health, connection termination, client ip, proxy protocol v2 |
//! | gateway | GENEVE | `target_failover.*` |
//!
//! `lambda` targets only expose the common keys plus
//! `lambda.multi_value_headers.enabled`. The reconciler never enforces this
//! matrix; the set of keys a live target group reports is authoritative.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// A known advanced attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancedAttribute {
  /// Field name in the component definition.
  pub field: &'static str,
  /// Dotted key used by the control plane.
  pub key: &'static str,
  /// Control plane default.
  pub default: &'static str,
}

const fn attr(field: &'static str, key: &'static str, default: &'static str) -> AdvancedAttribute {
  AdvancedAttribute { field, key, default }
}

pub const DEREGISTRATION_DELAY_TIMEOUT: &str = "deregistration_delay.timeout_seconds";
pub const STICKINESS_ENABLED: &str = "stickiness.enabled";
pub const STICKINESS_TYPE: &str = "stickiness.type";
pub const CROSS_ZONE_ENABLED: &str = "load_balancing.cross_zone.enabled";
pub const DNS_FAILOVER_COUNT: &str = "target_group_health.dns_failover.minimum_healthy_targets.count";
pub const DNS_FAILOVER_PERCENTAGE: &str = "target_group_health.dns_failover.minimum_healthy_targets.percentage";
pub const UNHEALTHY_ROUTING_COUNT: &str = "target_group_health.unhealthy_state_routing.minimum_healthy_targets.count";
pub const UNHEALTHY_ROUTING_PERCENTAGE: &str =
  "target_group_health.unhealthy_state_routing.minimum_healthy_targets.percentage";
pub const ALGORITHM_TYPE: &str = "load_balancing.algorithm.type";
pub const SLOW_START_DURATION: &str = "slow_start.duration_seconds";
pub const APP_COOKIE_NAME: &str = "stickiness.app_cookie.cookie_name";
pub const APP_COOKIE_DURATION: &str = "stickiness.app_cookie.duration_seconds";
pub const LB_COOKIE_DURATION: &str = "stickiness.lb_cookie.duration_seconds";
pub const LAMBDA_MULTI_VALUE_HEADERS: &str = "lambda.multi_value_headers.enabled";
pub const CONNECTION_TERMINATION: &str = "deregistration_delay.connection_termination.enabled";
pub const PRESERVE_CLIENT_IP: &str = "preserve_client_ip.enabled";
pub const PROXY_PROTOCOL_V2: &str = "proxy_protocol_v2.enabled";
pub const FAILOVER_ON_DEREGISTRATION: &str = "target_failover.on_deregistration";
pub const FAILOVER_ON_UNHEALTHY: &str = "target_failover.on_unhealthy";

/// Every advanced attribute the reconciler knows about.
pub const ADVANCED_ATTRIBUTES: &[AdvancedAttribute] = &[
  attr("deregistration_delay_timeout_seconds", DEREGISTRATION_DELAY_TIMEOUT, "300"),
  attr("stickiness_enabled", STICKINESS_ENABLED, "false"),
  attr("stickiness_type", STICKINESS_TYPE, "lb_cookie"),
  attr("load_balancing_cross_zone_enabled", CROSS_ZONE_ENABLED, "use_load_balancer_configuration"),
  attr(
    "target_group_health_dns_failover_minimum_healthy_targets_count",
    DNS_FAILOVER_COUNT,
    "off",
  ),
  attr(
    "target_group_health_dns_failover_minimum_healthy_targets_percentage",
    DNS_FAILOVER_PERCENTAGE,
    "off",
  ),
  attr(
    "target_group_health_unhealthy_state_routing_minimum_healthy_targets_count",
    UNHEALTHY_ROUTING_COUNT,
    "1",
  ),
  attr(
    "target_group_health_unhealthy_state_routing_minimum_healthy_targets_percentage",
    UNHEALTHY_ROUTING_PERCENTAGE,
    "off",
  ),
  attr("load_balancing_algorithm_type", ALGORITHM_TYPE, "round_robin"),
  attr("slow_start_duration_seconds", SLOW_START_DURATION, "0"),
  attr("stickiness_app_cookie_cookie_name", APP_COOKIE_NAME, ""),
  attr("stickiness_app_cookie_duration_seconds", APP_COOKIE_DURATION, "86400"),
  attr("stickiness_lb_cookie_duration_seconds", LB_COOKIE_DURATION, "86400"),
  attr("lambda_multi_value_headers_enabled", LAMBDA_MULTI_VALUE_HEADERS, "false"),
  attr(
    "deregistration_delay_connection_termination_enabled",
    CONNECTION_TERMINATION,
    "false",
  ),
  attr("preserve_client_ip_enabled", PRESERVE_CLIENT_IP, "true"),
  attr("proxy_protocol_v2_enabled", PROXY_PROTOCOL_V2, "false"),
  attr("target_failover_on_deregistration", FAILOVER_ON_DEREGISTRATION, "no_rebalance"),
  attr("target_failover_on_unhealthy", FAILOVER_ON_UNHEALTHY, "no_rebalance"),
];

static DEFAULTS: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
  ADVANCED_ATTRIBUTES
    .iter()
    .map(|a| (a.key.to_string(), a.default.to_string()))
    .collect()
});

/// Documented control plane default for every advanced attribute key.
pub fn documented_defaults() -> &'static BTreeMap<String, String> {
  &DEFAULTS
}

/// Look up a known attribute by its definition field name.
pub fn by_field(field: &str) -> Option<&'static AdvancedAttribute> {
  ADVANCED_ATTRIBUTES.iter().find(|a| a.field == field)
}

/// Load balancer family implied by a target group protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadBalancerFamily {
  Application,
  Network,
  Gateway,
  Unknown,
}

impl LoadBalancerFamily {
  pub fn from_protocol(protocol: &str) -> Self {
    match protocol.to_ascii_uppercase().as_str() {
      "HTTP" | "HTTPS" => LoadBalancerFamily::Application,
      "TCP" | "TLS" | "UDP" | "TCP_UDP" => LoadBalancerFamily::Network,
      "GENEVE" => LoadBalancerFamily::Gateway,
      _ => LoadBalancerFamily::Unknown,
    }
  }
}

/// Keys a target group with this protocol and target type exposes.
pub fn exposed_keys(protocol: &str, target_type: &str) -> Vec<&'static str> {
  let mut keys = vec![DEREGISTRATION_DELAY_TIMEOUT, STICKINESS_ENABLED, STICKINESS_TYPE];

  if target_type.eq_ignore_ascii_case("lambda") {
    keys.push(LAMBDA_MULTI_VALUE_HEADERS);
    return keys;
  }

  let health = [
    CROSS_ZONE_ENABLED,
    DNS_FAILOVER_COUNT,
    DNS_FAILOVER_PERCENTAGE,
    UNHEALTHY_ROUTING_COUNT,
    UNHEALTHY_ROUTING_PERCENTAGE,
  ];

  match LoadBalancerFamily::from_protocol(protocol) {
    LoadBalancerFamily::Application => {
      keys.extend(health);
      if target_type.eq_ignore_ascii_case("instance") || target_type.eq_ignore_ascii_case("ip") {
        keys.extend([
          ALGORITHM_TYPE,
          SLOW_START_DURATION,
          APP_COOKIE_NAME,
          APP_COOKIE_DURATION,
          LB_COOKIE_DURATION,
        ]);
      }
    }
    LoadBalancerFamily::Network => {
      keys.extend(health);
      keys.extend([CONNECTION_TERMINATION, PRESERVE_CLIENT_IP, PROXY_PROTOCOL_V2]);
    }
    LoadBalancerFamily::Gateway => {
      keys.extend([FAILOVER_ON_DEREGISTRATION, FAILOVER_ON_UNHEALTHY]);
    }
    LoadBalancerFamily::Unknown => {}
  }

  keys
}
