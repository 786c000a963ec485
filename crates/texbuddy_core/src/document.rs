//! A LaTeX document together with its plain-text view.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use texbuddy_text::{LineIndex, ParseError, Position, PositionTranslator, detex};
use tracing::debug;

use crate::error::BuddyError;

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(?:input|include)\s*\{([^}]+)\}").expect("include pattern is valid")
});

/// A document under check.
///
/// Holds the original source, the detexed plain text, the translator between
/// the two and the parse errors of the detexing step.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    source: String,
    plain: String,
    parse_errors: Vec<ParseError>,
    translator: PositionTranslator,
}

impl Document {
    /// Reads a document from disk. Invalid UTF-8 sequences are replaced.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BuddyError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| {
            BuddyError::file(format!("Failed to read {}: {e}", path.display()))
        })?;
        let source = String::from_utf8_lossy(&bytes).into_owned();
        Ok(Self::from_source(path, source))
    }

    /// Builds a document from an in-memory source.
    pub fn from_source(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        let path = path.into();
        let source = source.into();
        let detexed = detex(&source);
        let translator = detexed.translator(&source);
        debug!(
            "Detexed {}: {} plain chars, {} parse error(s)",
            path.display(),
            detexed.plain.chars().count(),
            detexed.errors.len()
        );

        Self {
            path,
            source,
            plain: detexed.plain,
            parse_errors: detexed.errors,
            translator,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The detexed plain text.
    pub fn plain(&self) -> &str {
        &self.plain
    }

    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    pub fn translator(&self) -> &PositionTranslator {
        &self.translator
    }

    pub fn source_lines(&self) -> &LineIndex {
        self.translator.source_lines()
    }

    /// Source position of a *byte* offset into [`source`](Self::source).
    ///
    /// Regex matches report byte offsets, positions count characters.
    pub fn position_of_byte(&self, byte_offset: usize) -> Option<Position> {
        let chars = self.source.get(..byte_offset)?.chars().count();
        self.source_lines().position(chars)
    }

    /// Returns true if the byte at `byte_offset` sits inside a `%` comment.
    pub fn is_commented_out(&self, byte_offset: usize) -> bool {
        let Some(before) = self.source.get(..byte_offset) else {
            return false;
        };
        let line = before.rfind('\n').map_or(before, |newline| &before[newline + 1..]);
        strip_comment(line).len() < line.len()
    }

    /// Files pulled in with `\input{}` or `\include{}`, in order of appearance.
    ///
    /// Names without extension get `.tex`; relative names are resolved
    /// against the directory of this document. Commented-out includes are
    /// skipped.
    pub fn included_paths(&self) -> Vec<PathBuf> {
        let base = self.path.parent().unwrap_or(Path::new(""));
        let mut paths = Vec::new();
        for line in self.source.lines() {
            for captures in INCLUDE.captures_iter(strip_comment(line)) {
                let mut included = PathBuf::from(captures[1].trim());
                if included.extension().is_none() {
                    included.set_extension("tex");
                }
                let resolved = base.join(included);
                if !paths.contains(&resolved) {
                    paths.push(resolved);
                }
            }
        }
        paths
    }
}

/// Cuts `line` at the first unescaped `%`.
fn strip_comment(line: &str) -> &str {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            '%' if !escaped => return &line[..idx],
            _ => escaped = false,
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_from_source() {
        let doc = Document::from_source("a.tex", "Hello \\emph{world}.\n% note\n");
        assert_eq!(doc.plain(), "Hello world.\n\n");
        assert!(doc.parse_errors().is_empty());
        assert_eq!(
            doc.translator().to_original(6),
            Some(Position::new(1, 13))
        );
    }

    #[test]
    fn test_load_replaces_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.tex");
        fs::write(&path, b"ok \xff done").unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.source(), "ok \u{fffd} done");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Document::load(dir.path().join("missing.tex")).unwrap_err();
        assert!(matches!(err, BuddyError::File(_)));
    }

    #[test]
    fn test_position_of_byte_counts_chars() {
        let doc = Document::from_source("a.tex", "Grüße\nzwei");
        let byte = doc.source().find("zwei").unwrap();
        assert_eq!(doc.position_of_byte(byte), Some(Position::new(2, 1)));
        let byte = doc.source().find('e').unwrap();
        assert_eq!(doc.position_of_byte(byte), Some(Position::new(1, 5)));
    }

    #[test]
    fn test_is_commented_out() {
        let source = "see 1999\n% old 2000\n50\\% of 3000 % 4000";
        let doc = Document::from_source("a.tex", source);
        let at = |needle: &str| source.find(needle).unwrap();

        assert!(!doc.is_commented_out(at("1999")));
        assert!(doc.is_commented_out(at("2000")));
        assert!(!doc.is_commented_out(at("3000")));
        assert!(doc.is_commented_out(at("4000")));
    }

    #[test]
    fn test_included_paths() {
        let source = "\\input{intro}\n\\include{chapters/one.tex}\n% \\input{old}\n\\input{intro}\n";
        let doc = Document::from_source("thesis/main.tex", source);
        assert_eq!(
            doc.included_paths(),
            vec![
                PathBuf::from("thesis/intro.tex"),
                PathBuf::from("thesis/chapters/one.tex"),
            ]
        );
    }

    #[rstest]
    #[case("text % comment", "text ")]
    #[case("50\\% off % note", "50\\% off ")]
    #[case("\\\\% comment", "\\\\")]
    #[case("no comment", "no comment")]
    fn test_strip_comment(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(strip_comment(line), expected);
    }
}
