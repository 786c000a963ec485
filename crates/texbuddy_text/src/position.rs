//! Position types and line lookup for source text.
//!
//! All offsets handled here are *character* offsets (Unicode scalar values),
//! not byte offsets: the detexer and the external tools texbuddy talks to
//! count characters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in source text.
///
/// Both line and column are 1-indexed. Serialized as a `[line, column]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Position {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl From<(u32, u32)> for Position {
    fn from((line, column): (u32, u32)) -> Self {
        Self::new(line, column)
    }
}

impl From<Position> for (u32, u32) {
    fn from(pos: Position) -> Self {
        (pos.line, pos.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Maps character offsets to line/column pairs and back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Character offset at which each line starts. Always contains `0`.
    line_starts: Vec<usize>,
    /// Total length of the text in characters.
    len: usize,
}

impl LineIndex {
    /// Builds the index for `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut len = 0;
        for (i, c) in text.chars().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
            len = i + 1;
        }
        Self { line_starts, len }
    }

    /// Number of lines. An empty text has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Length of the indexed text in characters.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the indexed text is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Character offset of the first character of `line` (1-indexed).
    pub fn line_start(&self, line: u32) -> Option<usize> {
        let idx = (line as usize).checked_sub(1)?;
        self.line_starts.get(idx).copied()
    }

    /// Converts a character offset into a position.
    ///
    /// `offset == len()` is valid and denotes the end of the text.
    pub fn position(&self, offset: usize) -> Option<Position> {
        if offset > self.len {
            return None;
        }
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let column = offset - self.line_starts[line - 1] + 1;
        Some(Position::new(line as u32, column as u32))
    }

    /// Converts a position back into a character offset.
    ///
    /// A column may point at the line break terminating its line, but not
    /// beyond it.
    pub fn offset(&self, pos: Position) -> Option<usize> {
        let start = self.line_start(pos.line)?;
        let column = (pos.column as usize).checked_sub(1)?;
        let line_end = match self.line_starts.get(pos.line as usize) {
            Some(next) => next - 1,
            None => self.len,
        };
        let offset = start + column;
        (offset <= line_end).then_some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_position_display() {
        assert_eq!(Position::new(3, 7).to_string(), "3:7");
    }

    #[test]
    fn test_position_serializes_as_pair() {
        let json = serde_json::to_string(&Position::new(4, 2)).unwrap();
        assert_eq!(json, "[4,2]");

        let pos: Position = serde_json::from_str("[10,1]").unwrap();
        assert_eq!(pos, Position::new(10, 1));
    }

    #[test]
    fn test_position_ordering_is_line_major() {
        assert!(Position::new(1, 80) < Position::new(2, 1));
        assert!(Position::new(2, 1) < Position::new(2, 3));
    }

    #[rstest]
    #[case::first_char(0, Position::new(1, 1))]
    #[case::newline_char(3, Position::new(1, 4))]
    #[case::second_line(4, Position::new(2, 1))]
    #[case::empty_line(7, Position::new(3, 1))]
    #[case::end_of_text(10, Position::new(4, 3))]
    fn test_offset_to_position(#[case] offset: usize, #[case] expected: Position) {
        let index = LineIndex::new("abc\nde\n\nfg");
        assert_eq!(index.position(offset), Some(expected));
    }

    #[test]
    fn test_offset_past_end() {
        let index = LineIndex::new("abc");
        assert_eq!(index.position(4), None);
    }

    #[test]
    fn test_position_to_offset_roundtrip() {
        let index = LineIndex::new("abc\nde\n\nfg");
        for offset in 0..=index.len() {
            let pos = index.position(offset).unwrap();
            assert_eq!(index.offset(pos), Some(offset), "offset {offset}");
        }
    }

    #[rstest]
    #[case::line_zero(Position::new(0, 1))]
    #[case::column_zero(Position::new(1, 0))]
    #[case::beyond_line_break(Position::new(1, 6))]
    #[case::beyond_last_line(Position::new(5, 1))]
    fn test_invalid_positions(#[case] pos: Position) {
        let index = LineIndex::new("abc\nde\n\nfg");
        assert_eq!(index.offset(pos), None);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let index = LineIndex::new("Grüße\nx");
        assert_eq!(index.line_start(2), Some(6));
        assert_eq!(index.position(6), Some(Position::new(2, 1)));
    }

    #[test]
    fn test_empty_text() {
        let index = LineIndex::new("");
        assert!(index.is_empty());
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.position(0), Some(Position::new(1, 1)));
    }
}
