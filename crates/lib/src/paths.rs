use std::path::{Path, PathBuf};

use crate::consts::APP_NAME;

/// File holding the local control plane table.
pub const CONTROL_PLANE_FILENAME: &str = "control-plane.json";

/// Returns the user's home directory, or the working directory when `HOME`
/// is unset.
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the user's home directory, or the working directory when
/// `USERPROFILE` is unset.
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|_| PathBuf::from("."))
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir())
    .join(APP_NAME)
}

/// Directory holding local reconciler state. `TGSYNC_STATE_DIR` wins over the
/// platform data directory.
pub fn state_dir() -> PathBuf {
  if let Ok(path) = std::env::var("TGSYNC_STATE_DIR") {
    return PathBuf::from(path);
  }
  data_dir()
}

pub fn control_plane_path(state_dir: &Path) -> PathBuf {
  state_dir.join(CONTROL_PLANE_FILENAME)
}
