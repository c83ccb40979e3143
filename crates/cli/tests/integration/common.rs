//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

/// Get path to a fixture file.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

/// Read fixture content.
pub fn fixture_content(name: &str) -> String {
  std::fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the event file, the
/// control plane table and any result files.
pub struct TestEnv {
  pub temp: TempDir,
  pub event_path: PathBuf,
}

impl TestEnv {
  /// Create from a fixture file, keeping its extension so YAML events are
  /// parsed as YAML.
  pub fn from_fixture(name: &str) -> Self {
    let temp = TempDir::new().unwrap();
    let extension = PathBuf::from(name)
      .extension()
      .map(|ext| ext.to_string_lossy().into_owned())
      .unwrap_or_else(|| "json".to_string());
    let event_path = temp.path().join(format!("event.{}", extension));
    std::fs::write(&event_path, fixture_content(name)).unwrap();
    Self { temp, event_path }
  }

  /// Write a JSON file relative to the temp directory and return its path.
  pub fn write_json(&self, relative_path: &str, value: &Value) -> PathBuf {
    let path = self.temp.path().join(relative_path);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
  }

  /// Read a JSON file relative to the temp directory.
  pub fn read_json(&self, relative_path: &str) -> Value {
    let text = std::fs::read_to_string(self.temp.path().join(relative_path)).unwrap();
    serde_json::from_str(&text).unwrap()
  }

  /// State directory holding the control plane table.
  pub fn state_path(&self) -> PathBuf {
    self.temp.path().join("state")
  }

  /// The control plane table, as written by the binary.
  pub fn table(&self) -> Value {
    let text = std::fs::read_to_string(self.state_path().join("control-plane.json")).unwrap();
    serde_json::from_str(&text).unwrap()
  }

  /// Overwrite the control plane table.
  pub fn write_table(&self, table: &Value) {
    std::fs::write(
      self.state_path().join("control-plane.json"),
      serde_json::to_string_pretty(table).unwrap(),
    )
    .unwrap();
  }

  /// Get a pre-configured Command for the tgsync binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `TGSYNC_STATE_DIR`: Isolated state directory
  /// - `AWS_REGION`: Fixed region so ARNs are predictable
  pub fn tgsync_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("tgsync");
    cmd.env("TGSYNC_STATE_DIR", self.state_path());
    cmd.env("AWS_REGION", "us-east-1");
    cmd.env_remove("TGSYNC_MAX_RETRIES");
    cmd.env_remove("TGSYNC_RETRY_DELAY");
    cmd
  }

  /// Run `invoke` on the environment's event, saving the result to `result_name`.
  pub fn invoke_saving(&self, result_name: &str) -> assert_cmd::assert::Assert {
    self
      .tgsync_cmd()
      .arg("invoke")
      .arg(&self.event_path)
      .arg("--output")
      .arg(self.temp.path().join(result_name))
      .assert()
  }
}
