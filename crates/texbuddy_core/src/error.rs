//! Error types for the aggregation engine.

use thiserror::Error;

use crate::whitelist::WhitelistError;

/// Errors that abort a run or a command.
///
/// Failures of individual checkers never surface here; they are logged and
/// degrade to an empty result (see [`crate::CheckerError`]).
#[derive(Debug, Error)]
pub enum BuddyError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File error.
    #[error("File error: {0}")]
    File(String),

    /// Whitelist error.
    #[error("Whitelist error: {0}")]
    Whitelist(#[from] WhitelistError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuddyError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }
}
