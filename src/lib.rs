//! flowprobe - scenario-driven UI workflow testing
//!
//! Expands override fields into a scenario matrix, rewrites intercepted
//! backend responses so the page under test sees each scenario, and runs
//! one isolated pipeline of steps per scenario with shared state carried
//! across pipelines through a durable snapshot.

pub mod cli;
pub mod commands;
pub mod common;
pub mod idgen;
pub mod intercept;
pub mod pipeline;
pub mod scenario;
pub mod session;
pub mod state;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use intercept::{InterceptionRule, Interceptor};
pub use pipeline::{PipelineTemplate, StepContext, WorkflowSequencer};
pub use scenario::{FieldValue, Scenario, ScenarioMatrix};
