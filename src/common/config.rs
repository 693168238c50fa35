//! Configuration file handling

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::paths::{config_path, default_snapshot_path};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Pipeline scheduling settings
    #[serde(default)]
    pub sequencer: SequencerConfig,

    /// Cross-run state settings
    #[serde(default)]
    pub state: StateConfig,

    /// Identifier generator settings
    #[serde(default)]
    pub generator: GeneratorConfig,
}

/// Timeout settings
#[derive(Debug, Deserialize, Clone)]
pub struct Timeouts {
    /// Default bound for condition polling
    #[serde(default = "default_wait")]
    pub wait_default_ms: u64,

    /// Interval between condition probes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for the real backend call behind an intercepted request
    #[serde(default = "default_upstream_request")]
    pub upstream_request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            wait_default_ms: default_wait(),
            poll_interval_ms: default_poll_interval(),
            upstream_request_secs: default_upstream_request(),
        }
    }
}

fn default_wait() -> u64 {
    10_000
}
fn default_poll_interval() -> u64 {
    100
}
fn default_upstream_request() -> u64 {
    30
}

/// Pipeline scheduling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SequencerConfig {
    /// How many scenario pipelines may hold a session at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_pipelines: usize,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pipelines: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    4
}

/// Cross-run state configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StateConfig {
    /// Location of the durable session snapshot
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

/// Identifier generator configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GeneratorConfig {
    /// Digits produced when no length is given
    #[serde(default = "default_id_length")]
    pub default_length: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            default_length: default_id_length(),
        }
    }
}

fn default_id_length() -> usize {
    11
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| super::Error::file_read(&path, e))?;
                return Self::from_toml(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.sequencer.max_concurrent_pipelines == 0 {
            return Err(super::Error::Config(
                "sequencer.max_concurrent_pipelines must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Resolve the snapshot file, falling back to the platform data dir
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        self.state
            .snapshot_path
            .clone()
            .or_else(default_snapshot_path)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.wait_default_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.upstream_request_secs)
    }
}
