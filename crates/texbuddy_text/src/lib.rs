//! # texbuddy_text
//!
//! Text-level building blocks for texbuddy.
//!
//! This crate provides:
//! - 1-based `Position`s and a character-based `LineIndex`
//! - The `PositionTranslator`, mapping the detexed plain-text view back
//!   to the original LaTeX source
//! - A small built-in detexer producing plain text, a char map and the
//!   structural errors found on the way
//!
//! ## Example
//!
//! ```rust
//! use texbuddy_text::{Position, detex};
//!
//! let detexed = detex("Hello \\textbf{world}!");
//! assert_eq!(detexed.plain, "Hello world!");
//!
//! let translator = detexed.translator("Hello \\textbf{world}!");
//! assert_eq!(translator.to_original(6), Some(Position::new(1, 15)));
//! ```

mod detex;
mod position;
mod translator;

pub use detex::{Detexed, ParseError, detex};
pub use position::{LineIndex, Position};
pub use translator::{PositionTranslationError, PositionTranslator};
