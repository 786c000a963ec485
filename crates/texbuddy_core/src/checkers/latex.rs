//! In-process LaTeX style checks.
//!
//! All of them scan the original source with regular expressions and report
//! INFO-level findings in the `latex` category.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::checker::{Checker, CheckerError};
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::{Problem, ProblemBuilder, Severity};

const CATEGORY: &str = "latex";

static FIGURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\\begin\{figure\*?\}.*?\\end\{figure\*?\}").expect("figure pattern is valid")
});
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\label\{([^}]*)\}").expect("label pattern is valid"));
static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:[cC]ref|[vV]ref|autoref|ref|pageref)\{([^}]*)\}")
        .expect("reference pattern is valid")
});
static LONG_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4,}").expect("number pattern is valid"));
static NUMBER_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d+(?:\.\d+)?\s?(?:mm|cm|km|mg|kg|ms|ns|Hz|kHz|MHz|GHz|kB|MB|GB|TB)\b")
        .expect("unit pattern is valid")
});
static SECTION_THEN_SUBSECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\section\*?\{([^}]*)\}\s*(?:\\label\{[^}]*\}\s*)?\\subsection")
        .expect("section pattern is valid")
});
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?|ftp)://[^\s{}]+").expect("url pattern is valid")
});
static PLAIN_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\ref\{([^}]*)\}").expect("ref pattern is valid"));

/// Arguments of these commands are never typeset as prose.
const VERBATIM_ARGUMENT_COMMANDS: &[&str] = &[
    "\\url{", "\\href{", "\\num{", "\\SI{", "\\si{", "\\qty{", "\\unit{", "\\label{", "\\ref{",
    "\\cref{", "\\cite{", "\\includegraphics{", "\\input{", "\\include{",
];

/// Returns true if the match at `start` sits in the first argument of a command in `commands`.
fn inside_argument_of(source: &str, start: usize, commands: &[&str]) -> bool {
    let before = &source[..start];
    let Some(open) = before.rfind('{') else {
        return false;
    };
    if before[open..].contains('}') {
        return false;
    }
    commands.iter().any(|cmd| before[..=open].ends_with(cmd))
}

fn finding(
    checker: &str,
    document: &Document,
    offset: usize,
    text: &str,
    problem_type: &str,
) -> ProblemBuilder {
    Problem::builder(checker, text)
        .with_file(document.path())
        .with_position(document.position_of_byte(offset))
        .with_type(problem_type)
        .with_category(CATEGORY)
        .with_severity(Severity::Info)
}

/// A figure whose label is never referenced.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnreferencedFigures;

impl UnreferencedFigures {
    pub const NAME: &'static str = "UnreferencedFigures";
}

impl Checker for UnreferencedFigures {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let source = document.source();
        let referenced: HashSet<&str> = REFERENCE
            .captures_iter(source)
            .filter_map(|caps| caps.get(1))
            .flat_map(|labels| labels.as_str().split(','))
            .map(str::trim)
            .collect();

        let mut problems = Vec::new();
        for figure in FIGURE.find_iter(source) {
            for caps in LABEL.captures_iter(figure.as_str()) {
                let Some(label) = caps.get(1) else { continue };
                if referenced.contains(label.as_str()) {
                    continue;
                }
                problems.push(
                    finding(
                        Self::NAME,
                        document,
                        figure.start() + label.start(),
                        label.as_str(),
                        "unreferenced-figure",
                    )
                    .with_description(format!("Figure {} is never referenced.", label.as_str()))
                    .with_context("\\label{", "}")
                    .build(),
                );
            }
        }
        Ok(problems)
    }
}

/// Numbers and quantities that should be typeset with siunitx.
#[derive(Debug, Clone, Copy, Default)]
pub struct SiUnitx;

impl SiUnitx {
    pub const NAME: &'static str = "SiUnitx";
}

impl Checker for SiUnitx {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let source = document.source();
        let mut problems = Vec::new();

        for number in LONG_NUMBER.find_iter(source) {
            if document.is_commented_out(number.start())
                || inside_argument_of(source, number.start(), VERBATIM_ARGUMENT_COMMANDS)
            {
                continue;
            }
            problems.push(
                finding(
                    Self::NAME,
                    document,
                    number.start(),
                    number.as_str(),
                    "number",
                )
                .with_description("For numbers with more than 3 digits, use \\num{} from siunitx.")
                .with_suggestions([format!("\\num{{{}}}", number.as_str())])
                .build(),
            );
        }

        for quantity in NUMBER_WITH_UNIT.find_iter(source) {
            if document.is_commented_out(quantity.start())
                || inside_argument_of(source, quantity.start(), VERBATIM_ARGUMENT_COMMANDS)
            {
                continue;
            }
            problems.push(
                finding(
                    Self::NAME,
                    document,
                    quantity.start(),
                    quantity.as_str(),
                    "unit",
                )
                .with_description("For quantities with units, use \\qty{}{} from siunitx.")
                .build(),
            );
        }
        Ok(problems)
    }
}

/// A section that opens directly with a subsection.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptySections;

impl EmptySections {
    pub const NAME: &'static str = "EmptySections";
}

impl Checker for EmptySections {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        Ok(SECTION_THEN_SUBSECTION
            .captures_iter(document.source())
            .filter_map(|caps: Captures<'_>| {
                let title = caps.get(1)?;
                Some(
                    finding(
                        Self::NAME,
                        document,
                        title.start(),
                        title.as_str(),
                        "empty-section",
                    )
                    .with_description(
                        "Sections should not be empty; add an introduction before the first subsection.",
                    )
                    .build(),
                )
            })
            .collect())
    }
}

/// Bare URLs outside of `\url{}` and `\href{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlCheck;

impl UrlCheck {
    pub const NAME: &'static str = "UrlCheck";
}

impl Checker for UrlCheck {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let source = document.source();
        Ok(URL
            .find_iter(source)
            .filter(|url| !document.is_commented_out(url.start()))
            .filter(|url| !inside_argument_of(source, url.start(), &["\\url{", "\\href{"]))
            .map(|url| {
                finding(Self::NAME, document, url.start(), url.as_str(), "bare-url")
                    .with_description("For URLs, use \\url{}.")
                    .with_suggestions([format!("\\url{{{}}}", url.as_str())])
                    .build()
            })
            .collect())
    }
}

/// Plain `\ref{}` where `\cref{}` would also typeset the kind of target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeUseOfRef;

impl NativeUseOfRef {
    pub const NAME: &'static str = "NativeUseOfRef";
}

impl Checker for NativeUseOfRef {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        Ok(PLAIN_REF
            .find_iter(document.source())
            .filter(|reference| !document.is_commented_out(reference.start()))
            .map(|reference| {
                let label = reference
                    .as_str()
                    .trim_start_matches("\\ref{")
                    .trim_end_matches('}');
                finding(Self::NAME, document, reference.start(), "\\ref", "ref")
                    .with_description("Prefer \\cref{} over \\ref{}.")
                    .with_context("", format!("{{{label}}}"))
                    .with_suggestions(["\\cref"])
                    .build()
            })
            .collect())
    }
}
