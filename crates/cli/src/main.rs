mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tgsync_lib::envelope::InvocationStatus;

/// tgsync - Declarative target group reconciler
#[derive(Parser)]
#[command(name = "tgsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Directory holding the local control plane table
  #[arg(long, global = true, env = "TGSYNC_STATE_DIR")]
  state_dir: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Run one invocation against the local control plane
  Invoke {
    /// Path to the event file (JSON or YAML)
    event: PathBuf,

    /// Continue from a result file written by an earlier `--output`
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Write the result JSON to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the desired state and starting operations without calling the control plane
  Plan {
    /// Path to the event file (JSON or YAML)
    event: PathBuf,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
  },

  /// List target groups in the local control plane
  Status {
    /// Print as JSON
    #[arg(long)]
    json: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let state_dir = cmd::resolve_state_dir(cli.state_dir);

  match cli.command {
    Commands::Invoke {
      event,
      resume,
      output,
      json,
    } => {
      let status = cmd::cmd_invoke(&event, resume.as_deref(), &state_dir, output.as_deref(), json, cli.verbose)?;
      if status == InvocationStatus::Failed {
        std::process::exit(1);
      }
    }
    Commands::Plan { event, json } => cmd::cmd_plan(&event, json)?,
    Commands::Status { json } => cmd::cmd_status(&state_dir, json, cli.verbose)?,
  }

  Ok(())
}
