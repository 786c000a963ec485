//! The checker contract and the registry of available checkers.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::checkers;
use crate::config::ModuleSelection;
use crate::context::RunContext;
use crate::document::Document;
use crate::problem::Problem;

/// Why a single checker produced no result.
///
/// These never abort a run; the aggregator logs them and moves on.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("executable '{0}' not found in PATH")]
    ExecutableNotFound(String),

    #[error("'{program}' failed with {status}: {stderr}")]
    Process {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("'{program}' did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("malformed output: {0}")]
    MalformedOutput(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CheckerError {
    /// Short name of the failure class, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecutableNotFound(_) => "ExecutableNotFound",
            Self::Process { .. } => "Process",
            Self::Timeout { .. } => "Timeout",
            Self::MalformedOutput(_) => "MalformedOutput",
            Self::Io(_) => "Io",
        }
    }
}

/// A tool that analyzes a document and reports problems.
///
/// Implementations must not block indefinitely; external processes are
/// bounded by [`RunContext::tool_timeout`].
pub trait Checker: Send + Sync {
    /// Module name, as used in configuration, directives and problem output.
    fn name(&self) -> &str;

    fn run(&self, ctx: &RunContext, document: &Document) -> Result<Vec<Problem>, CheckerError>;
}

type CheckerFactory = Box<dyn Fn() -> Box<dyn Checker> + Send + Sync>;

/// Explicit name to constructor map of known checkers.
#[derive(Default)]
pub struct CheckerRegistry {
    factories: BTreeMap<String, CheckerFactory>,
}

impl CheckerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in checker.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        checkers::register_builtins(&mut registry);
        registry
    }

    /// Registers a checker under `name`, replacing an earlier one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Checker> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            debug!("Replaced checker '{name}'");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiates every checker enabled for this run, in name order.
    pub fn select(&self, ctx: &RunContext) -> Vec<Box<dyn Checker>> {
        let config = ctx.config();
        if let ModuleSelection::Only(names) | ModuleSelection::Except(names) = &config.selection {
            for name in names.iter().filter(|name| !self.contains(name)) {
                warn!("Unknown module '{name}'");
            }
        }
        for name in config.modules.keys().filter(|name| !self.contains(name)) {
            warn!("Configuration for unknown module '{name}'");
        }

        self.factories
            .iter()
            .filter(|(name, _)| config.is_module_enabled(name))
            .map(|(_, factory)| factory())
            .collect()
    }
}

impl fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("checkers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuddyConfig;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    struct Named(&'static str);

    impl Checker for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn run(&self, _: &RunContext, _: &Document) -> Result<Vec<Problem>, CheckerError> {
            Ok(Vec::new())
        }
    }

    fn registry() -> CheckerRegistry {
        let mut registry = CheckerRegistry::new();
        registry.register("B", || Box::new(Named("B")));
        registry.register("A", || Box::new(Named("A")));
        registry.register("C", || Box::new(Named("C")));
        registry
    }

    fn selected(registry: &CheckerRegistry, config: BuddyConfig) -> Vec<String> {
        registry
            .select(&RunContext::new(config))
            .iter()
            .map(|checker| checker.name().to_string())
            .collect()
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = CheckerRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec![
                "Aspell",
                "BibtexDuplicates",
                "Chktex",
                "Detex",
                "EmptySections",
                "NativeUseOfRef",
                "SiUnitx",
                "UnreferencedFigures",
                "UrlCheck",
            ]
        );
    }

    #[test]
    fn test_select_all_in_name_order() {
        assert_eq!(selected(&registry(), BuddyConfig::new()), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_select_honours_config() {
        let config = BuddyConfig::from_json(
            r#"{ "enableModulesByDefault": false, "modules": { "B": true } }"#,
        )
        .unwrap();
        assert_eq!(selected(&registry(), config), vec!["B"]);

        let config = BuddyConfig::from_json(r#"{ "modules": { "A": { "enabled": false } } }"#)
            .unwrap();
        assert_eq!(selected(&registry(), config), vec!["B", "C"]);
    }

    #[test]
    fn test_select_honours_overrides() {
        let mut config = BuddyConfig::new();
        config.selection = ModuleSelection::Only(HashSet::from(["C".to_string(), "Z".to_string()]));
        assert_eq!(selected(&registry(), config), vec!["C"]);

        let mut config = BuddyConfig::new();
        config.selection = ModuleSelection::Except(HashSet::from(["A".to_string()]));
        assert_eq!(selected(&registry(), config), vec!["B", "C"]);
    }

    #[test]
    fn test_error_kind() {
        let err = CheckerError::ExecutableNotFound("aspell".to_string());
        assert_eq!(err.kind(), "ExecutableNotFound");
        assert_eq!(err.to_string(), "executable 'aspell' not found in PATH");
    }
}
