//! Scenario matrices
//!
//! A scenario is the backend state a pipeline pretends to observe, expressed
//! as override fields that the interceptor injects into real responses.

mod matrix;
mod value;

pub use matrix::{FieldSpec, Scenario, ScenarioMatrix};
pub use value::{FieldValue, ABSENT_SENTINEL};
