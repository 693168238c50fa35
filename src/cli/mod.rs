//! CLI command handling
//!
//! Dispatches CLI commands and formats their output.

use std::io::Read;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::{Commands, StateCommands};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::idgen::IdGenerator;
use crate::state::{CrossRunStateStore, SnapshotFile};
use crate::testing;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    let config = Config::load()?;

    match command {
        Commands::Matrix { suite } => {
            let suite = testing::load_suite(&suite)?;
            testing::print_matrix(&suite);
            Ok(())
        }

        Commands::Intercept {
            suite,
            rule,
            scenario,
            body,
            url,
        } => {
            let suite = testing::load_suite(&suite)?;
            let body = read_body(&body)?;
            let result = testing::dry_run(&suite, &rule, scenario, body, url.as_deref())?;
            testing::print_dry_run(&result);
            match result {
                testing::DryRun::Applied(_) => Ok(()),
                testing::DryRun::NotRouted { .. } => Err(Error::Config(format!(
                    "Rule '{}' does not take this URL",
                    rule
                ))),
            }
        }

        Commands::State { snapshot, command } => {
            let store = open_store(snapshot, &config)?;
            dispatch_state(&store, command)
        }

        Commands::Id {
            length,
            count,
            check_digit,
            seed,
        } => {
            let length = length.unwrap_or(config.generator.default_length);
            if length == 0 {
                return Err(Error::Config("--length must be at least 1".to_string()));
            }
            let mut ids = match seed {
                Some(seed) => IdGenerator::seeded(seed),
                None => IdGenerator::new(),
            };
            for _ in 0..count {
                let id = if check_digit {
                    ids.generate_with_check_digit(length)
                } else {
                    ids.generate(length)
                };
                println!("{}", id);
            }
            Ok(())
        }
    }
}

fn dispatch_state(store: &CrossRunStateStore, command: StateCommands) -> Result<()> {
    match command {
        StateCommands::Get { key } => {
            let value = store.require(&key)?;
            println!("{}", value);
            Ok(())
        }

        StateCommands::Set { key, value } => {
            store.write(&key, &value)?;
            println!("{} = {}", key, value);
            Ok(())
        }

        StateCommands::List => {
            let entries = store.entries()?;
            if entries.is_empty() {
                println!("No shared state in {}", store.file().path().display());
                return Ok(());
            }
            let width = entries.keys().map(|k| k.len()).max().unwrap_or(0);
            for (key, value) in &entries {
                println!("{:width$}  {}", key, value, width = width);
            }
            Ok(())
        }

        StateCommands::Require { keys } => {
            let entries = store.entries()?;
            for key in &keys {
                if !entries.contains_key(key) {
                    return Err(Error::missing_state(key));
                }
            }
            println!("{} {} keys present", "✓".green(), keys.len());
            Ok(())
        }

        StateCommands::Check { keys } => {
            let snapshot = store.snapshot()?;
            let wanted: Vec<&str> = keys.iter().map(String::as_str).collect();
            let missing = snapshot.missing_app_keys(&wanted);
            if let Some(first) = missing.first() {
                for key in &missing {
                    println!("{} {}", "✗".red(), key);
                }
                return Err(Error::missing_state(first));
            }
            println!("{} {} keys present", "✓".green(), keys.len());
            Ok(())
        }
    }
}

fn open_store(snapshot: Option<PathBuf>, config: &Config) -> Result<CrossRunStateStore> {
    let path = snapshot
        .or_else(|| config.snapshot_path())
        .ok_or_else(|| Error::Config("Could not determine snapshot location; pass --snapshot".to_string()))?;
    Ok(CrossRunStateStore::new(SnapshotFile::new(path)))
}

fn read_body(path: &Path) -> Result<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        return Ok(body);
    }
    std::fs::read(path).map_err(|e| Error::file_read(path, e))
}
