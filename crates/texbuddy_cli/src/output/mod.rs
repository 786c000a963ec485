//! Output formatting module

mod json;
mod text;

use std::path::{Path, PathBuf};

use miette::Result;
use texbuddy_core::{Problem, Severity};

use crate::cli::OutputFormat;

/// Problems of one checked document, in display order.
pub struct FileReport {
    pub path: PathBuf,
    pub problems: Vec<Problem>,
}

impl FileReport {
    pub fn has_errors(&self) -> bool {
        self.problems
            .iter()
            .any(|problem| problem.severity() == Severity::Error)
    }
}

/// Prints the reports and, with an output directory, writes one JSON file per document.
///
/// Returns true if any ERROR-severity problem remains.
pub fn output_results(
    reports: &[FileReport],
    format: OutputFormat,
    output_dir: Option<&Path>,
) -> Result<bool> {
    let has_errors = reports.iter().any(FileReport::has_errors);

    if let Some(dir) = output_dir {
        let targets = json::result_paths(dir, reports.iter().map(|r| r.path.as_path()));
        for (target, report) in targets.iter().zip(reports) {
            json::write_json_file(target, report)?;
        }
    }

    match (format, output_dir) {
        (OutputFormat::Json, Some(_)) => {}
        (OutputFormat::Json, None) => json::output_json(reports)?,
        (OutputFormat::Text, _) => text::output_text(reports),
    }

    Ok(has_errors)
}
