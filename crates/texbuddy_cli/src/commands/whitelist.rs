//! Whitelist command implementation

use std::fs;

use miette::{IntoDiagnostic, Result};
use texbuddy_core::{Whitelist, wordlist_keys};
use tracing::info;

use super::load_config;
use crate::cli::{Cli, WhitelistCommands};

pub fn run_whitelist(cli: &Cli, command: &WhitelistCommands) -> Result<bool> {
    let config = load_config(cli)?;
    let mut whitelist = Whitelist::load(config.whitelist_path()).into_diagnostic()?;

    let added = match command {
        WhitelistCommands::Add { keys } => whitelist
            .add_all(keys.iter().map(String::as_str))
            .into_diagnostic()?,
        WhitelistCommands::FromWordlist { wordlist, language } => {
            let content = fs::read_to_string(wordlist).map_err(|e| {
                miette::miette!("Failed to read word list {}: {}", wordlist.display(), e)
            })?;
            let keys = wordlist_keys(&content, language);
            whitelist
                .add_all(keys.iter().map(String::as_str))
                .into_diagnostic()?
        }
    };

    info!(
        "Added {} key(s) to {} ({} total)",
        added,
        whitelist.path().display(),
        whitelist.len()
    );
    Ok(false)
}
