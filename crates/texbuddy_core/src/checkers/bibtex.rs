//! Duplicate detection over the BibTeX file a document cites.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::checker::{Checker, CheckerError};
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::{Problem, Severity};

/// Entries whose shared fields are on average more similar than this are reported.
const SIMILARITY_THRESHOLD: f64 = 0.85;

static BIBLIOGRAPHY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\bibliography\{([^}]+)\}").expect("bibliography pattern is valid")
});

/// Pairs of BibTeX entries that look like the same publication.
#[derive(Debug, Clone, Copy, Default)]
pub struct BibtexDuplicates;

impl BibtexDuplicates {
    pub const NAME: &'static str = "BibtexDuplicates";
}

impl Checker for BibtexDuplicates {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, _ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError> {
        let Some(path) = bibliography_path(document) else {
            return Ok(Vec::new());
        };
        let source = fs::read_to_string(&path).map_err(|e| {
            io::Error::new(e.kind(), format!("cannot read {}: {e}", path.display()))
        })?;

        let entries = parse_entries(&source);
        debug!("{} entries found in {}", entries.len(), path.display());

        let mut problems = Vec::new();
        for (i, first) in entries.iter().enumerate() {
            for second in &entries[i + 1..] {
                let ratio = first.similarity(second);
                if ratio <= SIMILARITY_THRESHOLD {
                    continue;
                }
                debug!(
                    "{} is probably a duplicate of {} (ratio {ratio:.3})",
                    first.id, second.id
                );
                problems.push(
                    Problem::builder(Self::NAME, format!("{} <=> {}", first.id, second.id))
                        .with_file(document.path())
                        .with_type("duplicate")
                        .with_category("bibliography")
                        .with_severity(Severity::Warning)
                        .with_description(
                            "Possible duplicate entries in the BibTeX file. These entries are \
                             very similar and might be redundant; compare them manually.",
                        )
                        .with_context("BibTeX duplicate: ", "")
                        .with_key(format!("{}/{}/{}", Self::NAME, first.id, second.id))
                        .build(),
                );
            }
        }
        Ok(problems)
    }
}

/// The `.bib` file named by the first uncommented `\bibliography{...}`,
/// relative to the document's directory.
fn bibliography_path(document: &Document) -> Option<PathBuf> {
    let caps = BIBLIOGRAPHY
        .captures_iter(document.source())
        .find(|caps| caps.get(0).is_some_and(|m| !document.is_commented_out(m.start())))?;
    let name = caps.get(1)?.as_str().split(',').next()?.trim();
    if name.is_empty() {
        return None;
    }
    let file = if name.ends_with(".bib") {
        name.to_string()
    } else {
        format!("{name}.bib")
    };
    Some(
        document
            .path()
            .parent()
            .map_or_else(|| PathBuf::from(&file), |dir| dir.join(&file)),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BibEntry {
    kind: String,
    id: String,
    /// Lower-cased field names with their raw values.
    fields: Vec<(String, String)>,
}

impl BibEntry {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Mean similarity over the entry type and every field both entries have.
    fn similarity(&self, other: &BibEntry) -> f64 {
        let mut total = ratio(&self.kind, &other.kind);
        let mut compared = 1u32;
        for (name, value) in &self.fields {
            if let Some(other_value) = other.field(name) {
                total += ratio(&clean(value), &clean(other_value));
                compared += 1;
            }
        }
        total / f64::from(compared)
    }
}

/// Strips surrounding braces and quotes, collapses whitespace and upper-cases.
fn clean(value: &str) -> String {
    value
        .trim_matches(|c: char| matches!(c, '{' | '}' | '"') || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// `2 * common / total` over characters, where `common` is the length of the
/// longest common subsequence. Two empty strings are identical.
fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for &ca in &a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    let common = previous[b.len()];

    (2 * common) as f64 / total as f64
}

/// Parses `@type{id, field = value, ...}` entries.
///
/// Values may be braced (nested braces allowed), quoted, or bare words.
/// `@comment`, `@string` and `@preamble` blocks are skipped, as is anything
/// malformed.
fn parse_entries(source: &str) -> Vec<BibEntry> {
    let mut entries = Vec::new();
    let mut rest = source;

    while let Some(at) = rest.find('@') {
        rest = &rest[at + 1..];
        let Some(open) = rest.find(['{', '(']) else {
            break;
        };
        let kind = rest[..open].trim().to_lowercase();
        let close_delim = if rest.as_bytes()[open] == b'{' { '}' } else { ')' };
        let Some(len) = body_len(&rest[open + 1..], close_delim) else {
            break;
        };
        let body = &rest[open + 1..open + 1 + len];
        rest = &rest[open + 1 + len..];

        if kind.is_empty()
            || !kind.chars().all(|c| c.is_ascii_alphanumeric())
            || matches!(kind.as_str(), "comment" | "string" | "preamble")
        {
            continue;
        }
        if let Some(entry) = parse_body(kind, body) {
            entries.push(entry);
        }
    }
    entries
}

/// Length of the entry body up to its closing delimiter at brace depth zero.
fn body_len(body: &str, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            '"' if depth == 0 => quoted = !quoted,
            c if c == close && depth == 0 && !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_body(kind: String, body: &str) -> Option<BibEntry> {
    let mut parts = split_top_level(body).into_iter();
    let id = parts.next()?.trim().to_string();
    if id.is_empty() || id.contains('=') {
        return None;
    }

    let fields = parts
        .filter_map(|part| {
            let (name, value) = part.split_once('=')?;
            let name = name.trim().to_lowercase();
            (!name.is_empty()).then(|| (name, value.trim().to_string()))
        })
        .collect();

    Some(BibEntry { kind, id, fields })
}

/// Splits on commas outside braces and quotes.
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '"' if depth == 0 => quoted = !quoted,
            ',' if depth == 0 && !quoted => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if !body[start..].trim().is_empty() {
        parts.push(&body[start..]);
    }
    parts
}
