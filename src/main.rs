//! flowprobe - scenario-driven response mutation for UI workflow tests
//!
//! Inspects suite matrices, dry-runs interception rules against captured
//! responses and manages the shared state carried between pipeline runs.

use clap::Parser;
use flowprobe::common::logging;
use flowprobe::{cli, commands};
use commands::Commands;

#[derive(Parser)]
#[command(name = "flowprobe", about = "Scenario matrices and response interception for UI workflow tests")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    if let Err(e) = cli::dispatch(cli.command).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
