//! Typed, versioned context passed from a producer pipeline to its consumers
//!
//! Both sides declare the same [`ContextContract`]. The payload is stored
//! under `ctx.<name>` as `{"version": N, "payload": ...}`, so a consumer
//! built against a different shape fails with a clear error instead of
//! reading a half-matching blob.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::common::{Error, Result};

use super::SharedState;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    payload: T,
}

#[derive(Deserialize)]
struct VersionOnly {
    version: u32,
}

/// Declaration of one producer/consumer context
pub struct ContextContract<T> {
    name: &'static str,
    version: u32,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for ContextContract<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextContract<T> {}

impl<T> std::fmt::Debug for ContextContract<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextContract")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

impl<T> ContextContract<T>
where
    T: Serialize + DeserializeOwned,
{
    pub const fn new(name: &'static str, version: u32) -> Self {
        Self {
            name,
            version,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Storage key for this context
    pub fn key(&self) -> String {
        format!("ctx.{}", self.name)
    }

    /// Write the payload, replacing any earlier one
    pub fn publish<S: SharedState + ?Sized>(&self, store: &mut S, payload: &T) -> Result<()> {
        let envelope = Envelope {
            version: self.version,
            payload,
        };
        store.put(&self.key(), serde_json::to_string(&envelope)?)
    }

    /// Read the payload; missing or mismatched versions are errors
    pub fn consume<S: SharedState + ?Sized>(&self, store: &S) -> Result<T> {
        let key = self.key();
        let raw = store.get(&key)?.ok_or_else(|| Error::missing_state(&key))?;

        let found: VersionOnly = serde_json::from_str(&raw)?;
        if found.version != self.version {
            return Err(Error::ContextVersionMismatch {
                name: self.name.to_string(),
                expected: self.version,
                found: found.version,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&raw)?;
        Ok(envelope.payload)
    }
}
