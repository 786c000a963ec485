//! # texbuddy_core
//!
//! Aggregation engine for texbuddy.
//!
//! This crate provides:
//! - The `Problem` model and its key/uid identity scheme
//! - The `Preprocessor`, turning inline `% buddy` directives into filters
//! - The persistent `Whitelist`
//! - The `Checker` contract, an explicit `CheckerRegistry` and the built-in checkers
//! - The `Aggregator`, running checkers in parallel and merging their findings
//!
//! ## Example
//!
//! ```rust,ignore
//! use texbuddy_core::{Aggregator, BuddyConfig, CheckerRegistry, Document, RunContext, Whitelist};
//!
//! let ctx = RunContext::new(BuddyConfig::from_file(".texbuddy.jsonc")?);
//! let aggregator = Aggregator::from_registry(&CheckerRegistry::with_builtins(), &ctx);
//! let whitelist = Whitelist::load(ctx.config().whitelist_path())?;
//!
//! let document = Document::load("thesis.tex")?;
//! for problem in aggregator.check(&ctx, &document, &whitelist).sorted() {
//!     println!("{problem}");
//! }
//! ```

mod aggregator;
pub mod checker;
pub mod checkers;
mod config;
mod context;
mod document;
mod error;
pub mod preprocessor;
mod problem;
pub mod process;
mod whitelist;

pub use aggregator::{Aggregator, ProblemSet};
pub use checker::{Checker, CheckerError, CheckerRegistry};
pub use config::{BuddyConfig, ModuleOption, ModuleSelection};
pub use context::RunContext;
pub use document::Document;
pub use error::BuddyError;
pub use preprocessor::{FilterKind, Preprocessor, ProblemFilter};
pub use problem::{
    PARSE_CATEGORY, Problem, ProblemBuilder, Severity, UnknownSeverity, sort_for_display,
};
pub use whitelist::{Whitelist, WhitelistError, wordlist_keys};

pub use texbuddy_text::{Position, PositionTranslationError, PositionTranslator};
