//! Ordered, fail-fast pipelines over a scenario matrix
//!
//! A [`PipelineTemplate`] lists the steps; the [`WorkflowSequencer`] runs the
//! template once per scenario, each run with its own session.
//!
//! ```text
//! ScenarioMatrix ─▶ WorkflowSequencer ─┬─▶ pipeline #0: open ─▶ step 1 ─▶ step 2 ─▶ close ─▶ commit
//!                                      ├─▶ pipeline #1: open ─▶ step 1 ✗            close
//!                                      └─▶ ...
//! ```

mod plan;
mod report;
mod sequencer;
mod step;
pub mod wait;

pub use plan::{Plan, PipelineTemplate};
pub use report::{Failure, PipelineOutcome, PipelineReport, SuiteReport};
pub use sequencer::WorkflowSequencer;
pub use step::{step_fn, FnStep, Step, StepContext};
pub use wait::WaitPolicy;
