//! Check command implementation

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use texbuddy_core::{
    Aggregator, CheckerRegistry, Document, ModuleSelection, RunContext, Whitelist,
};
use tracing::{info, warn};

use super::{absolute, load_config};
use crate::cli::{CheckArgs, Cli};
use crate::output::{FileReport, output_results};

pub fn run_check(cli: &Cli, args: &CheckArgs) -> Result<bool> {
    let mut config = load_config(cli)?;

    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(output) = &args.output {
        config.output = Some(absolute(output)?);
    }
    if !args.enable_modules.is_empty() {
        config.selection = ModuleSelection::Only(args.enable_modules.iter().cloned().collect());
    } else if !args.disable_modules.is_empty() {
        config.selection = ModuleSelection::Except(args.disable_modules.iter().cloned().collect());
    }

    let output_dir = config.output_dir();
    if let Some(dir) = &output_dir {
        prepare_output_dir(dir)?;
    }

    let ctx = RunContext::new(config);
    let aggregator = Aggregator::from_registry(&CheckerRegistry::with_builtins(), &ctx);
    info!("Running modules: {}", aggregator.checker_names().join(", "));

    let whitelist = Whitelist::load(ctx.config().whitelist_path()).into_diagnostic()?;

    let mut reports = Vec::new();
    for document in documents(&args.files)? {
        let problems = aggregator.check(&ctx, &document, &whitelist);
        reports.push(FileReport {
            path: document.path().to_path_buf(),
            problems: problems.into_sorted(),
        });
    }

    output_results(&reports, args.format, output_dir.as_deref())
}

fn prepare_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(miette::miette!(
            "Output path {} is not a directory",
            dir.display()
        ));
    }
    fs::create_dir_all(dir)
        .map_err(|e| miette::miette!("Cannot create output directory {}: {}", dir.display(), e))
}

/// The given files followed by everything they include, each once.
///
/// A missing top-level file is an error; a missing included file is skipped.
fn documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    for file in files {
        if !file.is_file() {
            return Err(miette::miette!("File not found: {}", file.display()));
        }
        queue.push_back(file.clone());
    }

    let mut ordered = Vec::new();
    while let Some(path) = queue.pop_front() {
        if !seen.insert(path.clone()) {
            continue;
        }
        let document = Document::load(&path).into_diagnostic()?;
        for included in document.included_paths() {
            if included.is_file() {
                queue.push_back(included);
            } else {
                warn!(
                    "{} includes {}, which does not exist",
                    path.display(),
                    included.display()
                );
            }
        }
        ordered.push(document);
    }
    Ok(ordered)
}
