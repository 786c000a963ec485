use std::path::Path;

use texbuddy_text::Position;
use tracing::debug;

use crate::checker::{Checker, CheckerError};
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::{Problem, Severity};
use crate::process::{find_executable, run_command};

const DELIMITER: &str = ":::";

/// file, line, column, length, number, text, message, kind, before, after
const FORMAT: &str = "%f:::%l:::%c:::%d:::%n:::%s:::%m:::%k:::%r:::%t\n";

const FIELD_COUNT: usize = 10;

/// Runs the external `chktex` LaTeX linter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chktex;

impl Chktex {
    pub const NAME: &'static str = "Chktex";
}

impl Checker for Chktex {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let program = find_executable("chktex")?;
        let args = vec![
            "--quiet".to_string(),
            "--format".to_string(),
            FORMAT.to_string(),
        ];
        let output = run_command(
            &program,
            &args,
            Some(document.source()),
            ctx.tool_timeout(),
        )?;

        // chktex exits non-zero whenever it reports something
        if !output.status.success() && output.stdout.trim().is_empty() {
            output.ensure_success(Self::NAME)?;
            return Ok(Vec::new());
        }
        parse_output(&output.stdout, document.path())
    }
}

/// Parses records produced with [`FORMAT`].
pub(crate) fn parse_output(output: &str, file: &Path) -> Result<Vec<Problem>, CheckerError> {
    let mut problems = Vec::new();
    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let fields: Vec<&str> = line.splitn(FIELD_COUNT, DELIMITER).collect();
        let [_, row, col, length, number, text, message, kind, before, after] = fields[..] else {
            return Err(CheckerError::MalformedOutput(format!(
                "expected {FIELD_COUNT} fields in chktex record: {line}"
            )));
        };

        let parse = |value: &str| {
            value.trim().parse::<u32>().map_err(|_| {
                CheckerError::MalformedOutput(format!("invalid number '{value}' in: {line}"))
            })
        };
        let position = Position::new(parse(row)?, parse(col)?);

        let severity = match kind.trim() {
            "Warning" => Severity::Warning,
            "Message" => Severity::Info,
            _ => Severity::Error,
        };
        let description = if text.is_empty() {
            format!("{message} (in {}:{position})", file.display())
        } else {
            message.to_string()
        };

        problems.push(
            Problem::builder(Chktex::NAME, text)
                .with_file(file)
                .with_position(position)
                .with_length(parse(length)? as usize)
                .with_type(number.trim())
                .with_category("latex")
                .with_severity(severity)
                .with_description(description)
                .with_context(before, after)
                .build(),
        );
    }
    debug!("chktex reported {} problem(s)", problems.len());
    Ok(problems)
}
