//! Run configuration.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::error::BuddyError;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Configuration for one texbuddy run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyConfig {
    /// Document language.
    #[serde(default = "default_language")]
    pub language: String,

    /// Whitelist file.
    #[serde(default = "default_whitelist")]
    pub whitelist: PathBuf,

    /// Directory for JSON results. Results go to stdout when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Whether modules without an explicit setting run.
    #[serde(default = "default_true")]
    pub enable_modules_by_default: bool,

    /// Bound for external tool processes, in seconds.
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,

    /// Per-module settings.
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleOption>,

    /// Module selection given on the command line. Overrides `modules`.
    #[serde(skip)]
    pub selection: ModuleSelection,

    /// Directory containing the configuration file. Relative paths resolve against it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_whitelist() -> PathBuf {
    PathBuf::from("whitelist")
}

fn default_true() -> bool {
    true
}

fn default_tool_timeout() -> u64 {
    60
}

/// Settings of one module: a bare flag or an options object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ModuleOption {
    Enabled(bool),
    Options(serde_json::Map<String, serde_json::Value>),
}

impl ModuleOption {
    /// The explicit `enabled` flag, if any.
    pub fn enabled(&self) -> Option<bool> {
        match self {
            ModuleOption::Enabled(enabled) => Some(*enabled),
            ModuleOption::Options(options) => options.get("enabled").and_then(|v| v.as_bool()),
        }
    }

    /// A tool-specific option.
    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        match self {
            ModuleOption::Enabled(_) => None,
            ModuleOption::Options(options) => options.get(name),
        }
    }
}

/// Command-line module selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ModuleSelection {
    /// Follow the configuration file.
    #[default]
    Configured,
    /// Run exactly these modules.
    Only(HashSet<String>),
    /// Run every otherwise enabled module except these.
    Except(HashSet<String>),
}

impl BuddyConfig {
    /// Config file names looked up by [`discover`](Self::discover), in order.
    pub const CONFIG_FILES: [&'static str; 2] = [".texbuddy.jsonc", ".texbuddy.json"];

    /// Creates a default configuration.
    pub fn new() -> Self {
        Self {
            language: default_language(),
            whitelist: default_whitelist(),
            output: None,
            enable_modules_by_default: true,
            tool_timeout_secs: default_tool_timeout(),
            modules: BTreeMap::new(),
            selection: ModuleSelection::Configured,
            base_dir: None,
        }
    }

    /// Finds a config file in `dir`.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.as_ref().join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BuddyError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| BuddyError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;

        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    /// Parses configuration from JSON (comments allowed) with schema validation.
    pub fn from_json(json: &str) -> Result<Self, BuddyError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| BuddyError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            let error_msg = format!("{} at {}", e, e.instance_path());
            return Err(BuddyError::config(format!(
                "Config validation failed: {}",
                error_msg
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| BuddyError::config(format!("Invalid config: {}", e)))
    }

    /// Settings of `module`, if configured.
    pub fn module(&self, name: &str) -> Option<&ModuleOption> {
        self.modules.get(name)
    }

    /// Whether `module` should run.
    pub fn is_module_enabled(&self, name: &str) -> bool {
        match &self.selection {
            ModuleSelection::Only(names) => names.contains(name),
            ModuleSelection::Except(names) if names.contains(name) => false,
            _ => self
                .module(name)
                .and_then(ModuleOption::enabled)
                .unwrap_or(self.enable_modules_by_default),
        }
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Whitelist path, resolved against the config file's directory.
    pub fn whitelist_path(&self) -> PathBuf {
        self.resolve(&self.whitelist)
    }

    /// Output directory, resolved against the config file's directory.
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output.as_deref().map(|dir| self.resolve(dir))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for BuddyConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_config_new() {
        let config = BuddyConfig::new();
        assert_eq!(config.language, "en");
        assert_eq!(config.whitelist, PathBuf::from("whitelist"));
        assert!(config.enable_modules_by_default);
        assert_eq!(config.tool_timeout(), Duration::from_secs(60));
        assert!(config.is_module_enabled("Aspell"));
    }

    #[test]
    fn test_config_from_jsonc() {
        let json = r#"{
            // comments are allowed
            "language": "de",
            "enableModulesByDefault": false,
            "toolTimeoutSecs": 5,
            "modules": {
                "Aspell": { "enabled": true, "lang": "de_DE" },
                "Chktex": true,
                "SiUnitx": false
            }
        }"#;

        let config = BuddyConfig::from_json(json).unwrap();
        assert_eq!(config.language, "de");
        assert_eq!(config.tool_timeout_secs, 5);
        assert!(config.is_module_enabled("Aspell"));
        assert!(config.is_module_enabled("Chktex"));
        assert!(!config.is_module_enabled("SiUnitx"));
        assert!(!config.is_module_enabled("UrlCheck"));
        assert_eq!(
            config.module("Aspell").and_then(|m| m.option("lang")),
            Some(&serde_json::json!("de_DE"))
        );
    }

    #[test]
    fn test_config_empty_document() {
        let config = BuddyConfig::from_json("// nothing here\n").unwrap();
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_config_validation_failure() {
        let err = BuddyConfig::from_json(r#"{ "toolTimeoutSecs": "soon" }"#).unwrap_err();
        assert!(err.to_string().contains("Config validation failed"));

        let err = BuddyConfig::from_json(r#"{ "colour": true }"#).unwrap_err();
        assert!(err.to_string().contains("Config validation failed"));
    }

    #[test]
    fn test_config_invalid_json() {
        let err = BuddyConfig::from_json("{ \"language\": ").unwrap_err();
        assert!(matches!(err, BuddyError::Config(_)));
    }

    #[test]
    fn test_module_selection() {
        let mut config = BuddyConfig::from_json(r#"{ "modules": { "Chktex": false } }"#).unwrap();

        config.selection = ModuleSelection::Only(HashSet::from(["Chktex".to_string()]));
        assert!(config.is_module_enabled("Chktex"));
        assert!(!config.is_module_enabled("Aspell"));

        config.selection = ModuleSelection::Except(HashSet::from(["Aspell".to_string()]));
        assert!(!config.is_module_enabled("Aspell"));
        assert!(!config.is_module_enabled("Chktex"));
        assert!(config.is_module_enabled("UrlCheck"));
    }

    #[test]
    fn test_from_file_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".texbuddy.json");
        fs::write(&path, r#"{ "whitelist": "words.txt", "output": "out" }"#).unwrap();

        assert_eq!(BuddyConfig::discover(dir.path()), Some(path.clone()));
        let config = BuddyConfig::from_file(&path).unwrap();
        assert_eq!(config.whitelist_path(), dir.path().join("words.txt"));
        assert_eq!(config.output_dir(), Some(dir.path().join("out")));
    }

    #[test]
    fn test_discover_prefers_jsonc() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".texbuddy.json"), "{}").unwrap();
        fs::write(dir.path().join(".texbuddy.jsonc"), "{}").unwrap();
        assert_eq!(
            BuddyConfig::discover(dir.path()),
            Some(dir.path().join(".texbuddy.jsonc"))
        );
    }
}
