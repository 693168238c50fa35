//! Configuration, state and log locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/flowprobe/`, `~/.local/share/flowprobe/`
//! - macOS: `~/Library/Application Support/flowprobe/`
//! - Windows: `%APPDATA%\flowprobe\`

use std::path::PathBuf;

/// Application name used for every platform directory
const APP_NAME: &str = "flowprobe";

/// File name of the durable session snapshot
const SNAPSHOT_FILE: &str = "session-state.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the data directory (snapshots live here)
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of the durable session snapshot
pub fn default_snapshot_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join(SNAPSHOT_FILE))
}

/// Get the path to the log directory
pub fn log_dir() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("logs"))
}
