//! Pipeline steps and the context they share
//!
//! Steps are opaque units of UI work. All they see is the [`StepContext`]
//! owned by their pipeline: the session, the scenario, the session-scoped
//! store and helpers. State built by one step (an entity created, a page
//! opened) is what the next step starts from.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::common::{Error, Result};
use crate::idgen::IdGenerator;
use crate::intercept::Interceptor;
use crate::scenario::Scenario;
use crate::session::BrowserSession;
use crate::state::SessionStore;

use super::wait::{Deadline, WaitPolicy};

/// Everything a running pipeline owns
pub struct StepContext {
    pipeline: String,
    scenario: Arc<Scenario>,
    session: Box<dyn BrowserSession>,
    interceptor: Interceptor,
    pub state: SessionStore,
    pub ids: IdGenerator,
    pub wait: WaitPolicy,
    cancel: CancellationToken,
}

impl StepContext {
    pub(crate) fn new(
        pipeline: String,
        scenario: Arc<Scenario>,
        session: Box<dyn BrowserSession>,
        interceptor: Interceptor,
        state: SessionStore,
        wait: WaitPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pipeline,
            scenario,
            session,
            interceptor,
            state,
            ids: IdGenerator::new(),
            wait,
            cancel,
        }
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn session(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub(crate) fn into_parts(self) -> (Box<dyn BrowserSession>, SessionStore) {
        (self.session, self.state)
    }

    /// Fail the step with an assertion error unless `condition` holds
    pub fn check(&self, condition: bool, message: impl FnOnce() -> String) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(Error::StepAssertion(message()))
        }
    }

    /// Wait until `selector` is visible, bounded by the context's policy
    pub async fn wait_visible(&mut self, selector: &str) -> Result<()> {
        let deadline = Deadline::start(self.wait);
        loop {
            if self.session.is_visible(selector).await? {
                return Ok(());
            }
            deadline
                .tick(&format!("'{}' to be visible", selector), &self.cancel)
                .await?;
        }
    }

    /// Wait until `selector` has non-empty text and return it
    pub async fn wait_text(&mut self, selector: &str) -> Result<String> {
        let deadline = Deadline::start(self.wait);
        loop {
            if let Some(text) = self.session.text(selector).await? {
                if !text.trim().is_empty() {
                    return Ok(text);
                }
            }
            deadline
                .tick(&format!("text in '{}'", selector), &self.cancel)
                .await?;
        }
    }

    /// Wait until the context has more than `known` open pages
    pub async fn wait_new_page(&mut self, known: usize) -> Result<usize> {
        let deadline = Deadline::start(self.wait);
        loop {
            let count = self.session.page_count().await?;
            if count > known {
                return Ok(count);
            }
            deadline
                .tick(&format!("more than {} open pages", known), &self.cancel)
                .await?;
        }
    }
}

/// One ordered unit of work within a pipeline
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &mut StepContext) -> Result<()>;
}

type StepFn = dyn for<'a> Fn(&'a mut StepContext) -> BoxFuture<'a, Result<()>> + Send + Sync;

/// [`Step`] backed by a closure
pub struct FnStep {
    name: String,
    f: Box<StepFn>,
}

#[async_trait]
impl Step for FnStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &mut StepContext) -> Result<()> {
        (self.f)(ctx).await
    }
}

/// Build a step from a closure returning a boxed future
///
/// ```ignore
/// let open = step_fn("open cash session", |ctx| Box::pin(async move {
///     ctx.session().click("#open-cash").await?;
///     ctx.wait_visible("#cash-balance").await
/// }));
/// ```
pub fn step_fn<F>(name: impl Into<String>, f: F) -> Arc<dyn Step>
where
    F: for<'a> Fn(&'a mut StepContext) -> BoxFuture<'a, Result<()>> + Send + Sync + 'static,
{
    Arc::new(FnStep {
        name: name.into(),
        f: Box::new(f),
    })
}
