//! JSON output formatter

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use tempfile::NamedTempFile;
use texbuddy_core::Problem;
use tracing::info;

use super::FileReport;

pub fn output_json(reports: &[FileReport]) -> Result<()> {
    let problems: Vec<&Problem> = reports.iter().flat_map(|r| &r.problems).collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&problems).into_diagnostic()?
    );
    Ok(())
}

/// Result file names for `documents`, unique within one output directory.
///
/// Each document gets `<stem>.result.json`; a stem seen before gets a
/// numeric suffix, `<stem>-2.result.json`, in input order.
pub fn result_paths<'a>(
    dir: &Path,
    documents: impl IntoIterator<Item = &'a Path>,
) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    documents
        .into_iter()
        .map(|document| {
            let stem = document
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".to_string());
            let mut name = format!("{stem}.result.json");
            let mut n = 2;
            while !used.insert(name.clone()) {
                name = format!("{stem}-{n}.result.json");
                n += 1;
            }
            dir.join(name)
        })
        .collect()
}

/// Writes the report to a temporary file first, so an interrupted run never
/// leaves a truncated result behind.
pub fn write_json_file(target: &Path, report: &FileReport) -> Result<()> {
    let dir = target.parent().unwrap_or(Path::new("."));
    let json = serde_json::to_string_pretty(&report.problems).into_diagnostic()?;

    let mut file = NamedTempFile::new_in(dir).into_diagnostic()?;
    file.write_all(json.as_bytes()).into_diagnostic()?;
    file.persist(target).into_diagnostic()?;

    info!("Wrote {} for {}", target.display(), report.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_paths() {
        assert_eq!(
            result_paths(Path::new("out"), [Path::new("thesis/main.tex")]),
            vec![PathBuf::from("out/main.result.json")]
        );
    }

    #[test]
    fn test_result_paths_with_same_stem() {
        let documents = [
            Path::new("a/main.tex"),
            Path::new("b/main.tex"),
            Path::new("main-2.tex"),
            Path::new("c/main.tex"),
        ];
        assert_eq!(
            result_paths(Path::new("out"), documents),
            vec![
                PathBuf::from("out/main.result.json"),
                PathBuf::from("out/main-2.result.json"),
                PathBuf::from("out/main-2-2.result.json"),
                PathBuf::from("out/main-3.result.json"),
            ]
        );
    }
}
