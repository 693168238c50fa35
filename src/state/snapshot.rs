//! Durable session snapshot on disk
//!
//! The file carries the driver's storage state (treated as opaque) next to
//! the shared entries pipelines hand to each other. It is rewritten whole
//! through a temp file in the same directory, so a crash mid-write leaves the
//! previous snapshot in place.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::{Error, Result};

/// Current on-disk format version
pub const SNAPSHOT_VERSION: u32 = 1;

fn snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

/// Contents of the snapshot file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default = "snapshot_version")]
    pub version: u32,
    /// Seconds since the epoch of the last save
    #[serde(default)]
    pub saved_at: u64,
    /// Storage state as produced by the automation driver
    #[serde(default)]
    pub driver_state: serde_json::Value,
    /// Entries shared between pipelines
    #[serde(default)]
    pub shared: BTreeMap<String, String>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: 0,
            driver_state: serde_json::Value::Null,
            shared: BTreeMap::new(),
        }
    }
}

impl SessionSnapshot {
    /// True if an application-level key is present
    ///
    /// Looks in the shared entries first, then in the driver's per-origin
    /// local storage (`origins[].localStorage[].name`).
    pub fn has_app_key(&self, key: &str) -> bool {
        if self.shared.contains_key(key) {
            return true;
        }
        self.driver_state
            .get("origins")
            .and_then(|o| o.as_array())
            .map(|origins| {
                origins.iter().any(|origin| {
                    origin
                        .get("localStorage")
                        .and_then(|ls| ls.as_array())
                        .map(|items| {
                            items
                                .iter()
                                .any(|item| item.get("name").and_then(|n| n.as_str()) == Some(key))
                        })
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false)
    }

    /// Keys from `keys` that [`has_app_key`](Self::has_app_key) cannot find
    pub fn missing_app_keys<'a>(&self, keys: &[&'a str]) -> Vec<&'a str> {
        keys.iter()
            .copied()
            .filter(|k| !self.has_app_key(k))
            .collect()
    }

    pub fn has_driver_state(&self) -> bool {
        !self.driver_state.is_null()
    }
}

/// Snapshot file location with load/save
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot; a missing file is an empty snapshot
    pub fn load(&self) -> Result<SessionSnapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionSnapshot::default());
            }
            Err(e) => return Err(Error::file_read(&self.path, e)),
        };

        let snapshot: SessionSnapshot =
            serde_json::from_str(&content).map_err(|e| Error::SnapshotParse {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::SnapshotParse {
                path: self.path.display().to_string(),
                reason: format!(
                    "written by a newer format (version {}, supported {})",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }
        Ok(snapshot)
    }

    /// Replace the snapshot atomically
    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut stamped = snapshot.clone();
        stamped.version = SNAPSHOT_VERSION;
        stamped.saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let json = serde_json::to_vec_pretty(&stamped)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(path = %self.path.display(), entries = stamped.shared.len(), "Snapshot saved");
        Ok(())
    }
}
