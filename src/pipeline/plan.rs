//! Pipeline templates and scenario-dependent step selection
//!
//! A template classifies each scenario once into a branch outcome (usually a
//! small enum), then picks its steps by looking only at that outcome. Steps
//! that depend on a UI affordance the backend state may hide are declared
//! with [`PipelineTemplate::step_when`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::scenario::Scenario;

use super::step::Step;

type Classifier<B> = Arc<dyn Fn(&Scenario) -> B + Send + Sync>;
type Inclusion<B> = Arc<dyn Fn(&B) -> bool + Send + Sync>;

struct PlannedStep<B> {
    step: Arc<dyn Step>,
    when: Option<Inclusion<B>>,
}

/// Steps selected for one scenario
pub struct Plan<B> {
    pub outcome: B,
    pub steps: Vec<Arc<dyn Step>>,
}

impl<B: fmt::Debug> fmt::Debug for Plan<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("outcome", &self.outcome)
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Ordered step list shared by every scenario of a matrix
pub struct PipelineTemplate<B> {
    name: String,
    classify: Classifier<B>,
    steps: Vec<PlannedStep<B>>,
    resume_session: bool,
    persist_session: bool,
    step_timeout: Option<Duration>,
}

impl PipelineTemplate<()> {
    /// Template whose steps do not depend on the scenario
    pub fn linear(name: impl Into<String>) -> Self {
        Self::new(name, |_| ())
    }
}

impl<B> PipelineTemplate<B>
where
    B: fmt::Debug + Send + Sync + 'static,
{
    pub fn new<F>(name: impl Into<String>, classify: F) -> Self
    where
        F: Fn(&Scenario) -> B + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            classify: Arc::new(classify),
            steps: Vec::new(),
            resume_session: false,
            persist_session: false,
            step_timeout: None,
        }
    }

    /// Append a step that always runs
    pub fn step(mut self, step: Arc<dyn Step>) -> Self {
        self.steps.push(PlannedStep { step, when: None });
        self
    }

    /// Append a step that runs only for matching branch outcomes
    pub fn step_when<F>(mut self, when: F, step: Arc<dyn Step>) -> Self
    where
        F: Fn(&B) -> bool + Send + Sync + 'static,
    {
        self.steps.push(PlannedStep {
            step,
            when: Some(Arc::new(when)),
        });
        self
    }

    /// Open the session from the persisted driver state instead of fresh
    pub fn resume_session(mut self) -> Self {
        self.resume_session = true;
        self
    }

    /// On success, also persist the driver storage state for later resumes
    pub fn persist_session(mut self) -> Self {
        self.persist_session = true;
        self
    }

    /// Bound each step's total run time
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resumes_session(&self) -> bool {
        self.resume_session
    }

    pub fn persists_session(&self) -> bool {
        self.persist_session
    }

    pub fn timeout_per_step(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Declared steps, including conditional ones
    pub fn declared_steps(&self) -> usize {
        self.steps.len()
    }

    /// Classify `scenario` and select its steps in declaration order
    pub fn plan(&self, scenario: &Scenario) -> Plan<B> {
        let outcome = (self.classify)(scenario);
        let steps = self
            .steps
            .iter()
            .filter(|planned| planned.when.as_ref().map_or(true, |when| when(&outcome)))
            .map(|planned| planned.step.clone())
            .collect();
        Plan { outcome, steps }
    }
}
