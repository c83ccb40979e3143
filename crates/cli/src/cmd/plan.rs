//! Implementation of the `tgsync plan` command.
//!
//! Shows the normalized desired state for an event and the operations an
//! invocation would start with. Never touches the control plane.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde_json::json;

use tgsync_lib::config::ReconcileConfig;
use tgsync_lib::envelope::InvocationKind;
use tgsync_lib::reconcile::plan;

use super::load_event;
use crate::output::{print_info, print_json, print_stat, symbols};

pub fn cmd_plan(event_path: &Path, json: bool) -> Result<()> {
  let event = load_event(event_path)?;
  let config = ReconcileConfig::from_env().context("Invalid configuration")?;
  let plan = plan(&event, &config)?;

  let pending = plan.envelope.pending.kinds();

  if json {
    return print_json(&json!({
      "op": event.op,
      "desired": plan.desired,
      "pending": pending,
    }));
  }

  let core = &plan.desired.core;
  print_info(&format!("Target group {}", core.name));
  print_stat("Protocol", &format!("{} ({})", core.protocol, core.protocol_version));
  print_stat("Port", &core.port.to_string());
  print_stat("VPC", core.vpc_id.as_deref().unwrap_or("(none)"));
  print_stat("Target type", &core.target_type);
  print_stat("IP address type", &core.ip_address_type);
  print_stat(
    "Health check",
    &format!(
      "{} {}:{} every {}s",
      core.health_check.protocol, core.health_check.path, core.health_check.port, core.health_check.interval_seconds
    ),
  );

  if !plan.desired.advanced.is_empty() {
    println!();
    print_info("Advanced attributes");
    for (key, value) in &plan.desired.advanced {
      print_stat(key, value);
    }
  }

  if event.op == InvocationKind::Upsert {
    let tags = plan.desired.tags.as_ref().filter(|tags| !tags.is_empty());
    println!();
    match tags {
      Some(tags) => {
        print_info("Tags");
        for (key, value) in tags {
          print_stat(key, value);
        }
      }
      None => print_info("Tags: none (existing tags will be removed)"),
    }
  }

  println!();
  if pending.is_empty() {
    print_info("Nothing to do");
  } else {
    print_info("Starting operations");
    for kind in pending {
      println!(
        "  {} {}",
        symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
        kind
      );
    }
  }

  Ok(())
}
