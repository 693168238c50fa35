//! Cross-run key/value store backed by the snapshot file
//!
//! There is no locking or versioning of individual keys. A consumer pipeline
//! only sees what a producer committed if the producer ran to completion
//! first; the sequencer's stage ordering is what provides that.

use std::collections::BTreeMap;

use crate::common::{Error, Result};

use super::session_store::SessionStore;
use super::snapshot::{SessionSnapshot, SnapshotFile};
use super::SharedState;

/// Durable bridge between independently launched pipelines
#[derive(Debug, Clone)]
pub struct CrossRunStateStore {
    file: SnapshotFile,
}

impl CrossRunStateStore {
    pub fn new(file: SnapshotFile) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &SnapshotFile {
        &self.file
    }

    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        self.file.load()
    }

    /// Last value written for `key` by any run
    pub fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.file.load()?.shared.remove(key))
    }

    /// Like [`read`](Self::read) but a missing key is an error
    pub fn require(&self, key: &str) -> Result<String> {
        self.read(key)?.ok_or_else(|| Error::missing_state(key))
    }

    /// Overwrite any prior value for `key` and persist immediately
    pub fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut snapshot = self.file.load()?;
        snapshot.shared.insert(key.to_string(), value.to_string());
        self.file.save(&snapshot)
    }

    pub fn entries(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.file.load()?.shared)
    }

    /// Session-scoped store seeded with every persisted entry
    pub fn begin_session(&self) -> Result<SessionStore> {
        Ok(SessionStore::seeded(self.file.load()?.shared))
    }

    /// Persist what a pipeline produced
    ///
    /// Keys the session wrote overwrite the durable ones; untouched keys are
    /// kept. `driver_state`, when given, replaces the stored credentials.
    pub fn commit(
        &self,
        session: &SessionStore,
        driver_state: Option<serde_json::Value>,
    ) -> Result<usize> {
        if !session.has_writes() && driver_state.is_none() {
            return Ok(0);
        }
        let mut snapshot = self.file.load()?;
        let mut count = 0;
        for (key, value) in session.written() {
            snapshot.shared.insert(key.to_string(), value.to_string());
            count += 1;
        }
        if let Some(state) = driver_state {
            snapshot.driver_state = state;
        }
        self.file.save(&snapshot)?;
        tracing::info!(path = %self.file.path().display(), keys = count, "Shared state committed");
        Ok(count)
    }
}

impl SharedState for CrossRunStateStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(key)
    }

    fn put(&mut self, key: &str, value: String) -> Result<()> {
        self.write(key, &value)
    }
}
