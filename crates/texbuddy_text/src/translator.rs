//! Translation of plain-text positions into original source positions.

use thiserror::Error;

use crate::{LineIndex, Position};

/// Errors raised when a plain-text position that should be mappable is not.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionTranslationError {
    /// The requested line/column does not exist in the plain text.
    #[error("position {line}:{column} is outside of the plain text")]
    OutOfRange { line: u32, column: u32 },

    /// The plain character exists but was generated without a source span.
    #[error("position {line}:{column} (offset {offset}) has no source mapping")]
    Unmapped { line: u32, column: u32, offset: usize },
}

/// Maps positions in the detexed plain text back to the original source.
///
/// The char map holds, for every plain character, the character offset of
/// the start of the source span that produced it, or `None` for generated
/// content. One extra trailing entry may describe the end of the document.
#[derive(Debug, Clone)]
pub struct PositionTranslator {
    char_map: Vec<Option<usize>>,
    source_lines: LineIndex,
    plain_lines: LineIndex,
}

impl PositionTranslator {
    /// Creates a translator from a precomputed char map.
    pub fn new(source: &str, plain: &str, char_map: Vec<Option<usize>>) -> Self {
        Self {
            char_map,
            source_lines: LineIndex::new(source),
            plain_lines: LineIndex::new(plain),
        }
    }

    /// Creates a translator for a document whose plain view is the source itself.
    pub fn identity(text: &str) -> Self {
        let lines = LineIndex::new(text);
        let char_map = (0..=lines.len()).map(Some).collect();
        Self {
            char_map,
            source_lines: lines.clone(),
            plain_lines: lines,
        }
    }

    /// Line index of the plain text.
    pub fn plain_lines(&self) -> &LineIndex {
        &self.plain_lines
    }

    /// Line index of the original source.
    pub fn source_lines(&self) -> &LineIndex {
        &self.source_lines
    }

    /// Translates an absolute plain-text character offset into a source position.
    ///
    /// Returns `None` when the offset has no corresponding source span, for
    /// example inside generated content or past the end of the map.
    pub fn to_original(&self, plain_offset: usize) -> Option<Position> {
        let source_offset = (*self.char_map.get(plain_offset)?)?;
        self.source_lines.position(source_offset)
    }

    /// Translates a plain-text line/column (1-indexed) into a source position.
    pub fn from_original_linecol(
        &self,
        line: u32,
        column: u32,
    ) -> Result<Position, PositionTranslationError> {
        let offset = self
            .plain_lines
            .offset(Position::new(line, column))
            .ok_or(PositionTranslationError::OutOfRange { line, column })?;

        self.to_original(offset)
            .ok_or(PositionTranslationError::Unmapped {
                line,
                column,
                offset,
            })
    }
}
