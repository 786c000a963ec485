//! Inline suppression directives.
//!
//! A document can silence findings with comment directives:
//!
//! ```latex
//! % buddy ignore-next 3 lines
//! % buddy begin-ignore modules Aspell Chktex
//! % buddy begin-ignore severities warning
//! % buddy begin-ignore whitelist-keys en/spelling/Dongbei
//! % buddy end-ignore severities warning
//! % buddy begin-ignore
//! % buddy end-ignore
//! ```
//!
//! Each directive kind opens at most one filter per discriminator at a time.
//! A bare `end-ignore` closes the open line filter, or the latest filter of
//! any kind when no line filter is open.
//! A filter covers the lines strictly between its `begin-ignore` and
//! `end-ignore` directives; one that is never closed reaches the end of the
//! document.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::problem::{Problem, Severity};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*%\s?buddy\s+(\S+)(.*)$").expect("directive pattern is valid")
});

/// What a filter discriminates on besides its line range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// Every problem in range.
    Lines,
    /// Problems reported by one checker.
    Module(String),
    /// Problems of exactly one severity.
    Severity(Severity),
    /// Problems with one whitelist key.
    WhitelistKey(String),
}

impl FilterKind {
    fn accepts(&self, problem: &Problem) -> bool {
        match self {
            Self::Lines => true,
            Self::Module(name) => problem.checker() == name,
            Self::Severity(severity) => problem.severity() == *severity,
            Self::WhitelistKey(key) => problem.key() == key,
        }
    }
}

/// A scoped suppression rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemFilter {
    pub kind: FilterKind,
    /// First suppressed line (1-indexed, inclusive).
    pub start_line: u32,
    /// Last suppressed line (inclusive). `None` while open, which means end of document.
    pub end_line: Option<u32>,
}

impl ProblemFilter {
    pub fn new(kind: FilterKind, start_line: u32, end_line: Option<u32>) -> Self {
        Self {
            kind,
            start_line,
            end_line,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_line.is_none()
    }

    /// Returns true if this filter suppresses `problem`.
    ///
    /// Position-less problems cannot be scoped to lines: they never match a
    /// pure line filter, and match a discriminating filter only when it stays
    /// open until the end of the document.
    pub fn matches(&self, problem: &Problem) -> bool {
        if !self.kind.accepts(problem) {
            return false;
        }
        match problem.line() {
            Some(line) => {
                line >= self.start_line && self.end_line.is_none_or(|end| line <= end)
            }
            None => self.kind != FilterKind::Lines && self.is_open(),
        }
    }
}

/// Builds and applies the filters declared by a document's directives.
#[derive(Debug, Default)]
pub struct Preprocessor {
    filters: Vec<ProblemFilter>,
    open: HashMap<FilterKind, usize>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans every line of `source` for directives.
    pub fn parse(source: &str) -> Self {
        let mut preprocessor = Self::new();
        for (idx, line) in source.lines().enumerate() {
            preprocessor.parse_line(line, idx as u32 + 1);
        }
        debug!(
            "Preprocessor collected {} filter(s)",
            preprocessor.filters.len()
        );
        preprocessor
    }

    /// Interprets a single source line. Lines without a directive are ignored.
    pub fn parse_line(&mut self, line: &str, line_num: u32) {
        let Some(captures) = DIRECTIVE.captures(line) else {
            return;
        };
        let verb = &captures[1];
        let args: Vec<&str> = captures[2].split_whitespace().collect();

        match verb {
            "ignore-next" => match ignored_line_count(&args) {
                Some(count) => self.filters.push(ProblemFilter::new(
                    FilterKind::Lines,
                    line_num.saturating_add(1),
                    Some(line_num.saturating_add(count)),
                )),
                None => invalid_directive(line, line_num),
            },
            "begin-ignore" => match parse_kinds(&args, line_num) {
                Some(kinds) => kinds.into_iter().for_each(|kind| self.begin(kind, line_num)),
                None => invalid_directive(line, line_num),
            },
            "end-ignore" if args.is_empty() => self.end_latest(line_num),
            "end-ignore" => match parse_kinds(&args, line_num) {
                Some(kinds) => kinds.into_iter().for_each(|kind| self.end(kind, line_num)),
                None => invalid_directive(line, line_num),
            },
            _ => warn!("Unknown directive '{verb}' in line {line_num}: {line}"),
        }
    }

    fn begin(&mut self, kind: FilterKind, line_num: u32) {
        if self.open.contains_key(&kind) {
            info!("Ignored 'begin-ignore' in line {line_num}: {kind:?} is already being ignored");
            return;
        }
        self.open.insert(kind.clone(), self.filters.len());
        self.filters.push(ProblemFilter::new(kind, line_num.saturating_add(1), None));
    }

    fn end(&mut self, kind: FilterKind, line_num: u32) {
        match self.open.remove(&kind) {
            Some(idx) => self.filters[idx].end_line = Some(line_num.saturating_sub(1)),
            None => info!(
                "Ignored 'end-ignore' in line {line_num}: {kind:?} was not being ignored"
            ),
        }
    }

    /// A bare `end-ignore` closes the open line filter, or else the most
    /// recently opened one.
    fn end_latest(&mut self, line_num: u32) {
        let kind = if self.open.contains_key(&FilterKind::Lines) {
            Some(FilterKind::Lines)
        } else {
            self.open
                .iter()
                .max_by_key(|&(_, idx)| *idx)
                .map(|(kind, _)| kind.clone())
        };
        match kind {
            Some(kind) => self.end(kind, line_num),
            None => info!("Ignored 'end-ignore' in line {line_num}: nothing was being ignored"),
        }
    }

    pub fn filters(&self) -> &[ProblemFilter] {
        &self.filters
    }

    /// Returns true if any filter suppresses `problem`.
    pub fn matches_filter(&self, problem: &Problem) -> bool {
        self.filters.iter().any(|filter| filter.matches(problem))
    }

    /// Removes every suppressed problem.
    pub fn apply(&self, problems: Vec<Problem>) -> Vec<Problem> {
        problems
            .into_iter()
            .filter(|problem| !self.matches_filter(problem))
            .collect()
    }
}

fn invalid_directive(line: &str, line_num: u32) {
    warn!("Invalid syntax: could not parse directive in line {line_num}: {line}");
}

/// `ignore-next`, `ignore-next line`, `ignore-next 1 line`, `ignore-next N lines`.
fn ignored_line_count(args: &[&str]) -> Option<u32> {
    match args {
        [] | ["line"] => Some(1),
        [count, "line" | "lines"] => count.parse().ok().filter(|&n: &u32| n > 0),
        _ => None,
    }
}

/// Parses the optional qualifier of `begin-ignore`/`end-ignore`.
fn parse_kinds(args: &[&str], line_num: u32) -> Option<Vec<FilterKind>> {
    let Some((qualifier, values)) = args.split_first() else {
        return Some(vec![FilterKind::Lines]);
    };
    if values.is_empty() {
        return None;
    }
    let kinds = match *qualifier {
        "module" | "modules" => values
            .iter()
            .map(|name| FilterKind::Module(name.to_string()))
            .collect(),
        "severity" | "severities" => values
            .iter()
            .filter_map(|value| match value.parse::<Severity>() {
                Ok(severity) => Some(FilterKind::Severity(severity)),
                Err(e) => {
                    warn!("Invalid directive argument in line {line_num}: {e}");
                    None
                }
            })
            .collect(),
        "whitelist-key" | "whitelist-keys" => values
            .iter()
            .map(|key| FilterKind::WhitelistKey(key.to_string()))
            .collect(),
        _ => return None,
    };
    Some(kinds)
}
