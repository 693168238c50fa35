//! Store scoped to one pipeline's session

use std::collections::{BTreeMap, BTreeSet};

use crate::common::{Error, Result};

use super::SharedState;

/// Key/value entries visible for the lifetime of one session
///
/// Seeded from the durable snapshot when the pipeline starts. Keys written
/// during the pipeline are tracked so only they are committed back.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    entries: BTreeMap<String, String>,
    written: BTreeSet<String>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from entries persisted by earlier pipelines
    pub fn seeded(entries: BTreeMap<String, String>) -> Self {
        Self {
            entries,
            written: BTreeSet::new(),
        }
    }

    /// Overwrite any prior value for `key`
    pub fn write(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.written.insert(key.clone());
        self.entries.insert(key, value.into());
    }

    /// Last written value, or `None` if no one wrote it
    pub fn read(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Like [`read`](Self::read) but a missing key is an error
    pub fn require(&self, key: &str) -> Result<&str> {
        self.read(key).ok_or_else(|| Error::missing_state(key))
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Entries written during this session, in key order
    pub fn written(&self) -> impl Iterator<Item = (&str, &str)> {
        self.written.iter().filter_map(|k| {
            self.entries
                .get(k)
                .map(|v| (k.as_str(), v.as_str()))
        })
    }

    pub fn has_writes(&self) -> bool {
        !self.written.is_empty()
    }
}

impl SharedState for SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read(key).map(str::to_string))
    }

    fn put(&mut self, key: &str, value: String) -> Result<()> {
        self.write(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_round_trip() {
        let mut store = SessionStore::new();
        store.write("person.id", "40212345678");
        assert_eq!(store.read("person.id"), Some("40212345678"));
        store.write("person.id", "00112345670");
        assert_eq!(store.read("person.id"), Some("00112345670"));
    }

    #[test]
    fn test_seeded_entries_are_not_written() {
        let mut seed = BTreeMap::new();
        seed.insert("auth.user".to_string(), "teller01".to_string());
        let mut store = SessionStore::seeded(seed);
        assert_eq!(store.read("auth.user"), Some("teller01"));
        assert!(!store.has_writes());

        store.write("credit.id", "77");
        let written: Vec<_> = store.written().collect();
        assert_eq!(written, vec![("credit.id", "77")]);
    }

    #[test]
    fn test_require_missing_key_fails_loudly() {
        let store = SessionStore::new();
        assert!(store.read("cash.session").is_none());
        assert!(matches!(
            store.require("cash.session"),
            Err(Error::MissingSharedState { ref key }) if key == "cash.session"
        ));
    }
}
