//! Text output formatter

use texbuddy_core::Severity;

use super::FileReport;

pub fn output_text(reports: &[FileReport]) {
    for report in reports {
        if report.problems.is_empty() {
            continue;
        }

        println!("\n{}:", report.path.display());
        for problem in &report.problems {
            println!("  {}", problem);
        }
    }

    let total_files = reports.len();
    let total_problems: usize = reports.iter().map(|r| r.problems.len()).sum();
    let errors = reports
        .iter()
        .flat_map(|r| &r.problems)
        .filter(|p| p.severity() == Severity::Error)
        .count();

    println!();
    println!(
        "Checked {} files, found {} problems ({} errors)",
        total_files, total_problems, errors
    );
}
