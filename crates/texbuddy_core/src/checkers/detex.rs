use crate::checker::{Checker, CheckerError};
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::{PARSE_CATEGORY, Problem, Severity};

/// Reports the structural errors found while detexing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detex;

impl Detex {
    pub const NAME: &'static str = "Detex";
}

impl Checker for Detex {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        Ok(document
            .parse_errors()
            .iter()
            .map(|error| {
                Problem::builder(Self::NAME, error.message.as_str())
                    .with_file(document.path())
                    .with_position(error.position)
                    .with_length(1)
                    .with_type("detex")
                    .with_category(PARSE_CATEGORY)
                    .with_severity(Severity::Error)
                    .with_description(
                        "The document could not be fully converted to plain text; \
                         findings near this position may be inaccurate.",
                    )
                    .build()
            })
            .collect())
    }
}
