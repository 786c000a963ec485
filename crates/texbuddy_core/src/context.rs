//! Per-run context threaded through every checker.

use std::time::Duration;

use crate::config::{BuddyConfig, ModuleOption};

/// Everything a checker may consult during one run.
///
/// Built once per invocation and passed explicitly; nothing is global.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    config: BuddyConfig,
}

impl RunContext {
    pub fn new(config: BuddyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuddyConfig {
        &self.config
    }

    /// Document language, if one is configured.
    pub fn language(&self) -> Option<&str> {
        Some(self.config.language.as_str()).filter(|lang| !lang.is_empty())
    }

    /// Settings of one module.
    pub fn module(&self, name: &str) -> Option<&ModuleOption> {
        self.config.module(name)
    }

    /// String option of one module.
    pub fn module_str(&self, module: &str, option: &str) -> Option<&str> {
        self.module(module)?.option(option)?.as_str()
    }

    pub fn tool_timeout(&self) -> Duration {
        self.config.tool_timeout()
    }
}
