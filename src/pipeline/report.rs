//! Per-pipeline and per-suite results

use std::fmt;
use std::time::Duration;

use crate::common::Error;

/// Failure captured from a step, session or persistence error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

impl From<&Error> for Failure {
    fn from(e: &Error) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// How one pipeline ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Passed,
    /// Step `index` (0-based) failed; later steps never ran
    StepFailed {
        index: usize,
        step: String,
        failure: Failure,
    },
    /// No session could be opened; no step ran
    SessionFailed(Failure),
    /// All steps passed but shared state could not be persisted
    PersistFailed(Failure),
    /// Cancelled before step `before_step` started
    Cancelled { before_step: usize },
}

impl PipelineOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Result of one scenario's pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub pipeline: String,
    pub scenario_index: usize,
    pub scenario: String,
    /// Debug rendering of the branch outcome the steps were chosen by
    pub branch: String,
    pub outcome: PipelineOutcome,
    pub steps_run: usize,
    pub steps_total: usize,
    /// Entries committed to the durable store
    pub committed: usize,
    pub elapsed: Duration,
}

impl PipelineReport {
    pub fn passed(&self) -> bool {
        self.outcome.is_passed()
    }

    /// `pipeline#index`, unique within a suite
    pub fn id(&self) -> String {
        format!("{}#{}", self.pipeline, self.scenario_index)
    }
}

/// Every pipeline report of a run, in scenario order
#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub reports: Vec<PipelineReport>,
    pub elapsed: Duration,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(PipelineReport::passed)
    }

    pub fn extend(&mut self, other: SuiteReport) {
        self.reports.extend(other.reports);
        self.elapsed += other.elapsed;
    }
}
