//! Subcommand implementations

pub mod check;
pub mod whitelist;

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use texbuddy_core::BuddyConfig;
use tracing::debug;

use crate::cli::Cli;

/// Loads the configuration given with `--config`, or the one found in the
/// working directory, and applies the global overrides.
pub fn load_config(cli: &Cli) -> Result<BuddyConfig> {
    let mut config = match &cli.config {
        Some(path) => BuddyConfig::from_file(path).into_diagnostic()?,
        None => find_config()?,
    };

    if let Some(whitelist) = &cli.whitelist {
        config.whitelist = absolute(whitelist)?;
    }
    Ok(config)
}

fn find_config() -> Result<BuddyConfig> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    match BuddyConfig::discover(&cwd) {
        Some(path) => {
            debug!("Using configuration {}", path.display());
            BuddyConfig::from_file(path).into_diagnostic()
        }
        None => Ok(BuddyConfig::default()),
    }
}

/// Paths given on the command line are relative to the working directory,
/// not to the configuration file.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).into_diagnostic()
}
