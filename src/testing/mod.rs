//! Suite files
//!
//! Reads YAML suites declaring the override matrix and the interception
//! rules, and renders matrices, dry runs and pipeline reports.

mod config;
mod runner;

pub use config::*;
pub use runner::{dry_run, print_dry_run, print_matrix, print_suite_report, render_suite_report, DryRun};
