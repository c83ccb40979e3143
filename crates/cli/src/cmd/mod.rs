mod invoke;
mod plan;
mod status;

pub use invoke::cmd_invoke;
pub use plan::cmd_plan;
pub use status::cmd_status;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use tgsync_lib::envelope::InboundEvent;
use tgsync_lib::paths;

/// The `--state-dir` flag, else the default state directory.
pub fn resolve_state_dir(flag: Option<PathBuf>) -> PathBuf {
  flag.unwrap_or_else(paths::state_dir)
}

/// Read an event file. `.yaml` and `.yml` files are parsed as YAML, anything
/// else as JSON.
pub fn load_event(path: &Path) -> Result<InboundEvent> {
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read event file: {}", path.display()))?;

  let is_yaml = matches!(
    path.extension().and_then(|ext| ext.to_str()),
    Some("yaml") | Some("yml")
  );

  if is_yaml {
    let value: serde_json::Value =
      serde_yaml::from_str(&text).with_context(|| format!("Failed to parse YAML event: {}", path.display()))?;
    serde_json::from_value(value).with_context(|| format!("Invalid event: {}", path.display()))
  } else {
    InboundEvent::from_json(&text).with_context(|| format!("Invalid event: {}", path.display()))
  }
}
