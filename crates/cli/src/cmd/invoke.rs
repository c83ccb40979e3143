//! Implementation of the `tgsync invoke` command.
//!
//! Runs one invocation against the file-backed control plane in the state
//! directory and reports how it ended.

use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tracing::debug;

use tgsync_lib::client::local::LocalControlPlane;
use tgsync_lib::config::ReconcileConfig;
use tgsync_lib::envelope::{InvocationResult, InvocationStatus};
use tgsync_lib::paths::control_plane_path;
use tgsync_lib::reconcile::reconcile;

use super::load_event;
use crate::output::{format_duration, print_error, print_info, print_json, print_log, print_stat, print_success, print_warning};

/// Execute the invoke command.
///
/// With `resume`, the continuation from an earlier result file replaces any
/// `pass_back_data` in the event. Returns how the invocation ended so the
/// caller can pick an exit code.
pub fn cmd_invoke(
  event_path: &Path,
  resume: Option<&Path>,
  state_dir: &Path,
  output: Option<&Path>,
  json: bool,
  verbose: bool,
) -> Result<InvocationStatus> {
  let mut event = load_event(event_path)?;

  if let Some(resume_path) = resume {
    let previous = read_result(resume_path)?;
    let outcome = match previous.status() {
      InvocationStatus::Succeeded => "finished",
      InvocationStatus::Failed => "failed",
      InvocationStatus::Retrying => "",
    };
    match previous.pass_back_data {
      Some(envelope) => event.pass_back_data = Some(envelope),
      None => bail!(
        "Nothing to resume: {} records a {} invocation",
        resume_path.display(),
        outcome
      ),
    }
  }

  let config = ReconcileConfig::from_env().context("Invalid configuration")?;
  let store_path = control_plane_path(state_dir);
  let plane = LocalControlPlane::open(&store_path, config.region.clone())
    .with_context(|| format!("Failed to open control plane at {}", store_path.display()))?;

  debug!(
    store = %store_path.display(),
    region = %config.region,
    resumed = event.pass_back_data.is_some(),
    "invoking"
  );

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let start = Instant::now();
  let result = rt.block_on(reconcile(event, &plane, &config));
  let elapsed = start.elapsed();

  if let Some(output_path) = output {
    let text = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    fs::write(output_path, text).with_context(|| format!("Failed to write result: {}", output_path.display()))?;
  }

  let status = result.status();

  if json {
    print_json(&result)?;
    return Ok(status);
  }

  match status {
    InvocationStatus::Succeeded => {
      print_success(&format!("Invocation finished in {}", format_duration(elapsed)));
    }
    InvocationStatus::Retrying => {
      print_warning(&format!(
        "Invocation needs another pass in {}s (progress {}%)",
        result.callback_sec.unwrap_or_default(),
        result.progress
      ));
      if output.is_none() {
        print_info("Pass --output to save the continuation, then rerun with --resume");
      }
    }
    InvocationStatus::Failed => {
      print_error(result.error.as_deref().unwrap_or("Invocation failed"));
    }
  }

  print_summary(&result, verbose);
  Ok(status)
}

fn read_result(path: &Path) -> Result<InvocationResult> {
  let text = fs::read_to_string(path).with_context(|| format!("Failed to read result file: {}", path.display()))?;
  serde_json::from_str(&text).with_context(|| format!("Invalid result file: {}", path.display()))
}

fn print_summary(result: &InvocationResult, verbose: bool) {
  if let Some(name) = &result.props.name {
    print_stat("Name", name);
  }
  if let Some(arn) = &result.props.arn {
    print_stat("ARN", arn);
  }
  print_stat("Progress", &format!("{}%", result.progress));
  for (title, url) in &result.links {
    print_stat(title, url);
  }

  // Error entries are always shown; the rest only with --verbose.
  let logs: Vec<_> = result.logs.iter().filter(|entry| verbose || entry.is_error).collect();
  if !logs.is_empty() {
    println!();
    for entry in logs {
      print_log(entry);
    }
  }
}
