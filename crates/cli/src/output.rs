//! CLI output formatting utilities.
//!
//! Colored status lines, invocation log rendering and duration formatting.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use tgsync_lib::envelope::LogEntry;

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// One-line rendering of a log entry's details. Strings print bare, objects
/// and arrays as compact JSON.
pub fn format_details(details: &serde_json::Value) -> String {
  match details {
    serde_json::Value::Null => String::new(),
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_log(entry: &LogEntry) {
  let details = format_details(&entry.details);
  let title = if details.is_empty() {
    entry.title.clone()
  } else {
    format!("{}: {}", entry.title, details)
  };

  if entry.is_error {
    println!(
      "  {} {}",
      symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
      title
    );
  } else {
    println!(
      "  {} {}",
      symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      title
    );
  }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
