//! CLI command definitions
//!
//! Defines the clap commands for the flowprobe CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// List the scenarios a suite expands to
    Matrix {
        /// Path to the suite YAML file
        suite: PathBuf,
    },

    /// Apply one rule to a captured response body and print the result
    Intercept {
        /// Path to the suite YAML file
        suite: PathBuf,

        /// Name of the rule to apply
        #[arg(long, short)]
        rule: String,

        /// Scenario index as listed by `flowprobe matrix`
        #[arg(long, short)]
        scenario: usize,

        /// File holding the captured response body (`-` for stdin)
        #[arg(long, short)]
        body: PathBuf,

        /// Request URL; checks the rule is the one that would take the call
        #[arg(long)]
        url: Option<String>,
    },

    /// Inspect or edit the durable shared-state snapshot
    State {
        /// Snapshot file (default: from config, then the data directory)
        #[arg(long, global = true)]
        snapshot: Option<PathBuf>,

        #[command(subcommand)]
        command: StateCommands,
    },

    /// Generate numeric identifiers
    Id {
        /// Digits per identifier (default: from config)
        #[arg(long, short)]
        length: Option<usize>,

        /// How many identifiers to print
        #[arg(long, short, default_value = "1")]
        count: usize,

        /// Make the last digit a Luhn check digit
        #[arg(long)]
        check_digit: bool,

        /// Seed for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// Print one shared value
    Get {
        key: String,
    },

    /// Write one shared value
    Set {
        key: String,
        value: String,
    },

    /// Print every shared value
    List,

    /// Fail unless every key is present in the shared values
    Require {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Fail unless every key is present in the shared values or the saved
    /// browser storage
    Check {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}
