//! Browser session capability
//!
//! The automation driver itself lives outside this crate. It is reached
//! through [`SessionProvider`], which opens one isolated [`BrowserSession`]
//! (own cookies, storage and network routing) per pipeline. Nothing here is
//! global: a session is created for a pipeline, passed to its steps, and
//! closed when the pipeline ends.

use async_trait::async_trait;
use std::fmt;

use crate::common::Result;
use crate::intercept::Interceptor;

/// Identifier assigned to a session by the sequencer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(pipeline: &str, scenario_index: usize) -> Self {
        Self(format!("{}#{}", pipeline, scenario_index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the driver needs to open a session
#[derive(Clone)]
pub struct SessionOptions {
    pub id: SessionId,
    /// Routes outgoing calls through the scenario's rules
    pub interceptor: Option<Interceptor>,
    /// Driver storage state to resume from (cookies, local storage)
    pub resume_from: Option<serde_json::Value>,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("id", &self.id)
            .field("intercepting", &self.interceptor.is_some())
            .field("resuming", &self.resume_from.is_some())
            .finish()
    }
}

/// One isolated browser context owned by a single pipeline
#[async_trait]
pub trait BrowserSession: Send {
    fn id(&self) -> &SessionId;

    async fn navigate(&mut self, url: &str) -> Result<()>;

    async fn click(&mut self, selector: &str) -> Result<()>;

    async fn fill(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Text of the first element matching `selector`, `None` if absent
    async fn text(&mut self, selector: &str) -> Result<Option<String>>;

    async fn is_visible(&mut self, selector: &str) -> Result<bool>;

    /// Number of open pages (tabs) in this context
    async fn page_count(&mut self) -> Result<usize>;

    async fn current_url(&mut self) -> Result<String>;

    /// Driver-owned storage state, opaque to this crate
    async fn storage_state(&mut self) -> Result<serde_json::Value>;

    /// Release the context. Called exactly once, on every pipeline exit path.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for isolated sessions
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn open(&self, options: SessionOptions) -> Result<Box<dyn BrowserSession>>;
}
