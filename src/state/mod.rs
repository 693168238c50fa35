//! Cross-run state
//!
//! Two layers: a [`SessionStore`] that lives as long as one pipeline's
//! session, and the durable [`CrossRunStateStore`] whose snapshot file is
//! reloaded by later, separately launched pipelines.

mod contract;
mod session_store;
mod snapshot;
mod store;

pub use contract::ContextContract;
pub use session_store::SessionStore;
pub use snapshot::{SessionSnapshot, SnapshotFile, SNAPSHOT_VERSION};
pub use store::CrossRunStateStore;

use crate::common::Result;

/// Flat string key/value access shared by both layers
pub trait SharedState {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn put(&mut self, key: &str, value: String) -> Result<()>;
}
