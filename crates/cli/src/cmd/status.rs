//! Implementation of the `tgsync status` command.

use std::path::Path;

use anyhow::{Context, Result};

use tgsync_lib::client::local::LocalControlPlane;
use tgsync_lib::config::ReconcileConfig;
use tgsync_lib::paths::control_plane_path;

use crate::output::{print_info, print_json, print_stat};

pub fn cmd_status(state_dir: &Path, json: bool, verbose: bool) -> Result<()> {
  let config = ReconcileConfig::from_env().context("Invalid configuration")?;
  let store_path = control_plane_path(state_dir);
  let plane = LocalControlPlane::open(&store_path, config.region.clone())
    .with_context(|| format!("Failed to open control plane at {}", store_path.display()))?;

  let groups = plane.list();

  if json {
    return print_json(&groups);
  }

  if groups.is_empty() {
    print_info("No target groups. Run 'tgsync invoke <event>' to create one.");
    return Ok(());
  }

  print_info(&format!("{} target group(s) in {}", groups.len(), store_path.display()));
  for stored in &groups {
    let tg = &stored.target_group;
    println!();
    println!("{}", tg.name);
    print_stat("ARN", &tg.arn);
    print_stat("Listener", &format!("{}:{} ({})", tg.protocol, tg.port, tg.protocol_version));
    print_stat("Target type", &tg.target_type);
    print_stat("Tags", &stored.tags.len().to_string());
    if !tg.load_balancer_arns.is_empty() {
      print_stat("Load balancers", &tg.load_balancer_arns.join(", "));
    }

    if verbose {
      for (key, value) in &stored.tags {
        print_stat(&format!("tag {}", key), value);
      }
      for (key, value) in &stored.attributes {
        print_stat(key, value);
      }
    }
  }

  Ok(())
}
