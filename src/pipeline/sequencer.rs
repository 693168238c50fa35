//! Workflow sequencer
//!
//! Runs one pipeline per scenario. Inside a pipeline steps run strictly in
//! order and the first failure ends it; pipelines of other scenarios carry
//! on regardless. Each pipeline owns exactly one session, opened before its
//! first step and closed after its last, whatever the outcome.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{stream, FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::intercept::{InterceptionRule, Interceptor};
use crate::scenario::{Scenario, ScenarioMatrix};
use crate::session::{SessionId, SessionOptions, SessionProvider};
use crate::state::{CrossRunStateStore, SessionStore, SnapshotFile};

use super::plan::PipelineTemplate;
use super::report::{Failure, PipelineOutcome, PipelineReport, SuiteReport};
use super::step::{Step, StepContext};
use super::wait::WaitPolicy;

/// Schedules scenario pipelines against a session provider
pub struct WorkflowSequencer {
    provider: Arc<dyn SessionProvider>,
    rules: Arc<Vec<InterceptionRule>>,
    state: Option<CrossRunStateStore>,
    wait: WaitPolicy,
    max_concurrent: usize,
    cancel: CancellationToken,
}

impl WorkflowSequencer {
    pub fn new(provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            provider,
            rules: Arc::new(Vec::new()),
            state: None,
            wait: WaitPolicy::default(),
            max_concurrent: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Sequencer with waits, concurrency and snapshot location from `config`
    pub fn from_config(provider: Arc<dyn SessionProvider>, config: &Config) -> Self {
        let mut sequencer = Self::new(provider)
            .with_wait_policy(WaitPolicy::from_config(config))
            .with_max_concurrent(config.sequencer.max_concurrent_pipelines);
        if let Some(path) = config.snapshot_path() {
            sequencer = sequencer.with_state(CrossRunStateStore::new(SnapshotFile::new(path)));
        }
        sequencer
    }

    pub fn with_rules(mut self, rules: Vec<InterceptionRule>) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    pub fn with_state(mut self, state: CrossRunStateStore) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_wait_policy(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops every pipeline before its next step
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> Option<&CrossRunStateStore> {
        self.state.as_ref()
    }

    /// Run the template once per scenario
    ///
    /// Up to `max_concurrent` pipelines are in flight at once. Reports come
    /// back in matrix order regardless of completion order.
    pub async fn run<B>(&self, template: &PipelineTemplate<B>, matrix: &ScenarioMatrix) -> SuiteReport
    where
        B: fmt::Debug + Send + Sync + 'static,
    {
        let started = Instant::now();
        tracing::info!(
            pipeline = template.name(),
            scenarios = matrix.len(),
            max_concurrent = self.max_concurrent,
            "Running pipelines"
        );

        let reports: Vec<PipelineReport> = stream::iter(matrix.iter())
            .map(|scenario| self.run_scenario(template, scenario))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let suite = SuiteReport {
            reports,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            pipeline = template.name(),
            passed = suite.passed(),
            failed = suite.failed(),
            "Pipelines finished"
        );
        suite
    }

    /// Run the template for a single scenario
    pub async fn run_scenario<B>(
        &self,
        template: &PipelineTemplate<B>,
        scenario: &Scenario,
    ) -> PipelineReport
    where
        B: fmt::Debug + Send + Sync + 'static,
    {
        let span = tracing::info_span!(
            "pipeline",
            pipeline = template.name(),
            scenario = %scenario.label()
        );
        self.run_pipeline(template, scenario).instrument(span).await
    }

    async fn run_pipeline<B>(&self, template: &PipelineTemplate<B>, scenario: &Scenario) -> PipelineReport
    where
        B: fmt::Debug + Send + Sync + 'static,
    {
        let started = Instant::now();
        let scenario = Arc::new(scenario.clone());
        let plan = template.plan(&scenario);

        let mut report = PipelineReport {
            pipeline: template.name().to_string(),
            scenario_index: scenario.index(),
            scenario: scenario.label(),
            branch: format!("{:?}", plan.outcome),
            outcome: PipelineOutcome::Passed,
            steps_run: 0,
            steps_total: plan.steps.len(),
            committed: 0,
            elapsed: Duration::ZERO,
        };

        let (store, resume_from) = match self.seed(template.resumes_session()) {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load shared state");
                report.outcome = PipelineOutcome::SessionFailed(Failure::from(&e));
                report.elapsed = started.elapsed();
                return report;
            }
        };

        let interceptor = Interceptor::new(self.rules.clone(), scenario.clone());
        let options = SessionOptions {
            id: SessionId::new(template.name(), scenario.index()),
            interceptor: Some(interceptor.clone()),
            resume_from,
        };

        tracing::debug!(?options, branch = %report.branch, "Opening session");
        let session = match self.provider.open(options).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session could not be opened");
                report.outcome = PipelineOutcome::SessionFailed(Failure::from(&e));
                report.elapsed = started.elapsed();
                return report;
            }
        };

        let mut ctx = StepContext::new(
            template.name().to_string(),
            scenario.clone(),
            session,
            interceptor,
            store,
            self.wait,
            self.cancel.child_token(),
        );

        let (outcome, steps_run) =
            run_steps(&plan.steps, &mut ctx, template.timeout_per_step(), &self.cancel).await;
        report.outcome = outcome;
        report.steps_run = steps_run;

        // Driver state must be read while the session is still open
        let mut driver_state = None;
        if report.passed() && template.persists_session() && self.state.is_some() {
            match ctx.session().storage_state().await {
                Ok(state) => driver_state = Some(state),
                Err(e) => report.outcome = PipelineOutcome::PersistFailed(Failure::from(&e)),
            }
        }

        let (mut session, store) = ctx.into_parts();
        if let Err(e) = session.close().await {
            tracing::warn!(session = %session.id(), error = %e, "Session close failed");
        }

        if report.passed() {
            if let Some(state) = &self.state {
                match state.commit(&store, driver_state) {
                    Ok(count) => report.committed = count,
                    Err(e) => {
                        tracing::warn!(error = %e, "Shared state commit failed");
                        report.outcome = PipelineOutcome::PersistFailed(Failure::from(&e));
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        match &report.outcome {
            PipelineOutcome::Passed => tracing::info!(
                steps = report.steps_run,
                committed = report.committed,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Pipeline passed"
            ),
            other => tracing::warn!(outcome = ?other, steps_run = report.steps_run, "Pipeline failed"),
        }
        report
    }

    fn seed(&self, resume: bool) -> Result<(SessionStore, Option<serde_json::Value>)> {
        let Some(state) = &self.state else {
            if resume {
                tracing::warn!("Session resume requested but no state store is configured");
            }
            return Ok((SessionStore::new(), None));
        };

        let snapshot = state.snapshot()?;
        let resume_from = if resume {
            if snapshot.has_driver_state() {
                Some(snapshot.driver_state)
            } else {
                tracing::warn!(
                    path = %state.file().path().display(),
                    "Session resume requested but snapshot has no driver state"
                );
                None
            }
        } else {
            None
        };
        Ok((SessionStore::seeded(snapshot.shared), resume_from))
    }
}

/// Run steps in order until one fails
///
/// Returns the outcome and how many steps were started.
async fn run_steps(
    steps: &[Arc<dyn Step>],
    ctx: &mut StepContext,
    step_timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> (PipelineOutcome, usize) {
    for (index, step) in steps.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::info!(before_step = index, "Pipeline cancelled");
            return (PipelineOutcome::Cancelled { before_step: index }, index);
        }

        tracing::debug!(step = step.name(), index, "Step starting");
        let started = Instant::now();

        let result = run_one(step.as_ref(), ctx, step_timeout).await;

        match result {
            Ok(()) => {
                tracing::debug!(
                    step = step.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Step passed"
                );
            }
            Err(e) => {
                tracing::warn!(step = step.name(), index, error = %e, "Step failed");
                return (
                    PipelineOutcome::StepFailed {
                        index,
                        step: step.name().to_string(),
                        failure: Failure::from(&e),
                    },
                    index + 1,
                );
            }
        }
    }
    (PipelineOutcome::Passed, steps.len())
}

async fn run_one(step: &dyn Step, ctx: &mut StepContext, step_timeout: Option<Duration>) -> Result<()> {
    let guarded = AssertUnwindSafe(step.run(ctx)).catch_unwind();

    let caught = match step_timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(caught) => caught,
            Err(_) => {
                return Err(Error::WaitTimeout {
                    condition: format!("step '{}' to finish", step.name()),
                    elapsed_ms: limit.as_millis() as u64,
                })
            }
        },
        None => guarded.await,
    };

    caught.unwrap_or_else(|panic| {
        Err(Error::StepAssertion(format!(
            "step '{}' panicked: {}",
            step.name(),
            panic_message(panic.as_ref())
        )))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
