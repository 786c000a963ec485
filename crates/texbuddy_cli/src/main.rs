//! texbuddy CLI
//!
//! Runs LaTeX, spelling and style checkers over documents and reports their
//! findings as one deduplicated, whitelistable list.

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

/// Exit status after a user interrupt.
const EXIT_INTERRUPTED: u8 = 4;

enum Outcome {
    Clean,
    ErrorsFound,
    Interrupted,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::from(2);
        }
    };
    let outcome = runtime.block_on(run_until_interrupted(cli));
    // an interrupted check may still be running on a blocking thread
    runtime.shutdown_background();

    match outcome {
        Ok(Outcome::Clean) => ExitCode::SUCCESS,
        Ok(Outcome::ErrorsFound) => ExitCode::from(1),
        Ok(Outcome::Interrupted) => ExitCode::from(EXIT_INTERRUPTED),
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

async fn run_until_interrupted(cli: Cli) -> Result<Outcome> {
    let work = tokio::task::spawn_blocking(move || run(cli));

    tokio::select! {
        joined = work => {
            let has_errors = joined.into_diagnostic()??;
            Ok(if has_errors { Outcome::ErrorsFound } else { Outcome::Clean })
        }
        _ = interrupted() => {
            warn!("Received Ctrl+C, aborting");
            Ok(Outcome::Interrupted)
        }
    }
}

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Commands::Check(args) => commands::check::run_check(&cli, args),
        Commands::Whitelist { command } => commands::whitelist::run_whitelist(&cli, command),
    }
}
