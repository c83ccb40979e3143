//! Reconciler settings.
//!
//! All settings have defaults and can be overridden from the environment:
//!
//! | variable | setting | format |
//! |---|---|---|
//! | `TGSYNC_MAX_RETRIES` | `max_retry_attempts` | integer |
//! | `TGSYNC_RETRY_DELAY` | `retry_delay` | humantime duration (`15s`, `1m`) |
//! | `AWS_REGION`, then `AWS_DEFAULT_REGION` | `region` | region name |

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 6;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_REGION: &str = "us-east-1";

/// Errors that can occur while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("invalid {var}: {value:?} is not a non-negative integer")]
  InvalidRetryCount { var: &'static str, value: String },

  #[error("invalid {var}: {source}")]
  InvalidDuration {
    var: &'static str,
    #[source]
    source: humantime::DurationError,
  },

  #[error("{var} is set but empty")]
  EmptyRegion { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
  /// Attempts allowed per retry key before the invocation fails for good.
  pub max_retry_attempts: u32,
  /// Delay requested from the caller when a call fails transiently.
  pub retry_delay: Duration,
  /// Region recorded in state and used for console links.
  pub region: String,
}

impl Default for ReconcileConfig {
  fn default() -> Self {
    Self {
      max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
      retry_delay: DEFAULT_RETRY_DELAY,
      region: DEFAULT_REGION.to_string(),
    }
  }
}

impl ReconcileConfig {
  pub fn from_env() -> Result<Self, ConfigError> {
    let mut config = Self::default();

    if let Ok(value) = std::env::var("TGSYNC_MAX_RETRIES") {
      config.max_retry_attempts = value.trim().parse().map_err(|_| ConfigError::InvalidRetryCount {
        var: "TGSYNC_MAX_RETRIES",
        value: value.clone(),
      })?;
    }

    if let Ok(value) = std::env::var("TGSYNC_RETRY_DELAY") {
      config.retry_delay = humantime::parse_duration(value.trim()).map_err(|source| ConfigError::InvalidDuration {
        var: "TGSYNC_RETRY_DELAY",
        source,
      })?;
    }

    for var in ["AWS_REGION", "AWS_DEFAULT_REGION"] {
      if let Ok(value) = std::env::var(var) {
        let value = value.trim();
        if value.is_empty() {
          return Err(ConfigError::EmptyRegion { var });
        }
        config.region = value.to_string();
        break;
      }
    }

    Ok(config)
  }
}
