//! The canonical representation of a finding and its identity scheme.
//!
//! Every checker, internal or external, reports [`Problem`]s. Two identity
//! strings are derived when a problem is built:
//!
//! - the **key**, coarse and position independent, used for whitelisting and
//!   "same mistake anywhere" comparisons;
//! - the **uid**, unique per file, checker, category, type, position and
//!   length, used to index the live problem collection.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use texbuddy_text::Position;
use thiserror::Error;
use tracing::warn;

/// Category of structural findings (detexing failures). Sorts before everything else.
pub const PARSE_CATEGORY: &str = "parse";

/// Categories whose keys get the document language as prefix.
const LANGUAGE_CATEGORIES: &[&str] = &["spelling", "grammar"];

const MAX_SUGGESTIONS: usize = 10;

/// Unit separator. Never appears in paths, names or positions.
const UID_SEPARATOR: &str = "\u{1f}";

/// Severity of a problem.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None = 0,
    Info = 1,
    #[default]
    Warning = 2,
    Error = 3,
}

impl Severity {
    /// Lowercase name used in output and directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a severity name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// One diagnostic finding.
///
/// Problems are immutable once built; use [`Problem::builder`].
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    position: Option<Position>,
    text: String,
    checker: String,
    problem_type: String,
    #[serde(serialize_with = "serialize_path")]
    file: PathBuf,
    severity: Severity,
    length: usize,
    category: Option<String>,
    description: Option<String>,
    context: (String, String),
    suggestions: Vec<String>,
    key: String,
    #[serde(skip)]
    uid: String,
}

fn serialize_path<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

impl Problem {
    /// Starts building a problem reported by `checker` for the flagged `text`.
    pub fn builder(checker: impl Into<String>, text: impl Into<String>) -> ProblemBuilder {
        ProblemBuilder::new(checker, text)
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Line of the problem, if it has a position.
    pub fn line(&self) -> Option<u32> {
        self.position.map(|pos| pos.line)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn checker(&self) -> &str {
        &self.checker
    }

    pub fn problem_type(&self) -> &str {
        &self.problem_type
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn context(&self) -> (&str, &str) {
        (&self.context.0, &self.context.1)
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Whitelist key. Shared by all occurrences of the same finding.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Identity within the live collection.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Returns true for structural findings that must be shown first.
    pub fn is_parse_error(&self) -> bool {
        self.category.as_deref() == Some(PARSE_CATEGORY)
    }

    fn display_rank(&self) -> u8 {
        match (self.is_parse_error(), self.position) {
            (true, _) => 0,
            (false, None) => 1,
            (false, Some(_)) => 2,
        }
    }

    /// Display ordering: parse errors, then position-less problems, then by position.
    ///
    /// Ties are broken by checker, key and uid so the order is total and stable
    /// across runs regardless of the order tools finished in.
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        self.display_rank()
            .cmp(&other.display_rank())
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.checker.cmp(&other.checker))
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.uid.cmp(&other.uid))
    }
}

/// Equal iff both keys are equal and non-empty; positions are ignored.
impl PartialEq for Problem {
    fn eq(&self, other: &Self) -> bool {
        !self.key.is_empty() && self.key == other.key
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{pos}")?,
            None => f.write_str("-")?,
        }
        write!(
            f,
            " {} [{}/{}] {}",
            self.severity, self.checker, self.problem_type, self.text
        )?;
        if let Some(description) = &self.description {
            write!(f, ": {description}")?;
        }
        Ok(())
    }
}

/// Sorts problems into display order in place.
pub fn sort_for_display(problems: &mut [Problem]) {
    problems.sort_by(Problem::display_cmp);
}

/// Builder for [`Problem`]. Computes key and uid on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    checker: String,
    text: String,
    file: PathBuf,
    position: Option<Position>,
    length: Option<usize>,
    problem_type: String,
    category: Option<String>,
    severity: Severity,
    description: Option<String>,
    context: (String, String),
    suggestions: Vec<String>,
    key: Option<String>,
    language: Option<String>,
}

impl ProblemBuilder {
    fn new(checker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            checker: checker.into(),
            text: text.into(),
            file: PathBuf::new(),
            position: None,
            length: None,
            problem_type: String::new(),
            category: None,
            severity: Severity::default(),
            description: None,
            context: (String::new(), String::new()),
            suggestions: Vec::new(),
            key: None,
            language: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = file.into();
        self
    }

    /// Sets the position in the original source. Accepts `Position` or `Option<Position>`.
    pub fn with_position(mut self, position: impl Into<Option<Position>>) -> Self {
        self.position = position.into();
        self
    }

    /// Overrides the length, which otherwise defaults to the character count of the text.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_type(mut self, problem_type: impl Into<String>) -> Self {
        self.problem_type = problem_type.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_context(mut self, before: impl Into<String>, after: impl Into<String>) -> Self {
        self.context = (before.into(), after.into());
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    /// Supplies a producer-specific key instead of `checker/type/text`.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Document language, prefixed to spelling and grammar keys.
    pub fn with_language(mut self, language: Option<&str>) -> Self {
        self.language = language.filter(|l| !l.is_empty()).map(str::to_string);
        self
    }

    pub fn build(mut self) -> Problem {
        if self.position.is_some() && self.text.is_empty() {
            warn!(
                "{} reported a position for an empty text, dropping the position",
                self.checker
            );
            self.position = None;
        }
        self.suggestions.truncate(MAX_SUGGESTIONS);

        let length = self.length.unwrap_or_else(|| self.text.chars().count());
        let key = generate_key(
            self.key.take(),
            &self.checker,
            &self.problem_type,
            &self.text,
            self.category.as_deref(),
            self.language.as_deref(),
        );
        let uid = generate_uid(
            &self.file,
            &self.checker,
            self.category.as_deref(),
            &self.problem_type,
            self.position,
            length,
        );

        Problem {
            position: self.position,
            text: self.text,
            checker: self.checker,
            problem_type: self.problem_type,
            file: self.file,
            severity: self.severity,
            length,
            category: self.category,
            description: self.description,
            context: self.context,
            suggestions: self.suggestions,
            key,
            uid,
        }
    }
}

fn generate_key(
    supplied: Option<String>,
    checker: &str,
    problem_type: &str,
    text: &str,
    category: Option<&str>,
    language: Option<&str>,
) -> String {
    let key = supplied.unwrap_or_else(|| format!("{checker}/{problem_type}/{text}"));
    let key = match (language, category) {
        (Some(lang), Some(category)) if LANGUAGE_CATEGORIES.contains(&category) => {
            format!("{lang}/{key}")
        }
        _ => key,
    };
    key.replace(['\n', '\r'], "")
}

fn generate_uid(
    file: &Path,
    checker: &str,
    category: Option<&str>,
    problem_type: &str,
    position: Option<Position>,
    length: usize,
) -> String {
    let position = position.map_or_else(|| "None".to_string(), |pos| pos.to_string());
    [
        file.to_string_lossy().as_ref(),
        checker,
        category.unwrap_or("None"),
        problem_type,
        &position,
        &length.to_string(),
    ]
    .join(UID_SEPARATOR)
}
