//! Organizer configuration.
//!
//! Settings are read from a TOML file and cover three areas:
//! - Directory labels used when building destination paths
//! - Rules for skipping XML files in the source directory
//! - Limits for the interactive path prompt
//!
//! # Configuration File Format
//!
//! ```toml
//! [layout]
//! events_dir = "Eventos"
//! inbound_label = "Entrada"
//! outbound_label = "Saída"
//!
//! [filters]
//! exclude_filenames = ["modelo.xml"]
//! exclude_patterns = ["rascunho-*.xml"]
//! exclude_regex = ["^teste_\\d+\\.xml$"]
//!
//! [prompt]
//! max_attempts = 5
//! ```
//!
//! Every section and key is optional; missing values fall back to the
//! defaults shown above (with empty filter lists).

use crate::nfe::OperationType;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".nfe-organizer.toml";

/// Errors that can occur while loading or compiling configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure, or an unusable value.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizerConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub filters: FilterRules,

    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Directory names used in the destination tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Directory under the destination root that receives event documents.
    #[serde(default = "default_events_dir")]
    pub events_dir: String,

    /// Leaf directory for inbound invoices.
    #[serde(default = "default_inbound_label")]
    pub inbound_label: String,

    /// Leaf directory for outbound invoices.
    #[serde(default = "default_outbound_label")]
    pub outbound_label: String,
}

fn default_events_dir() -> String {
    "Eventos".to_string()
}

fn default_inbound_label() -> String {
    OperationType::Inbound.default_label().to_string()
}

fn default_outbound_label() -> String {
    OperationType::Outbound.default_label().to_string()
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            events_dir: default_events_dir(),
            inbound_label: default_inbound_label(),
            outbound_label: default_outbound_label(),
        }
    }
}

impl LayoutConfig {
    /// Returns the configured directory label for an operation type.
    ///
    /// # Examples
    ///
    /// ```
    /// use nfe_organizer::config::LayoutConfig;
    /// use nfe_organizer::nfe::OperationType;
    ///
    /// let layout = LayoutConfig::default();
    /// assert_eq!(layout.operation_label(OperationType::Inbound), "Entrada");
    /// assert_eq!(layout.operation_label(OperationType::Outbound), "Saída");
    /// ```
    pub fn operation_label(&self, operation_type: OperationType) -> &str {
        match operation_type {
            OperationType::Inbound => &self.inbound_label,
            OperationType::Outbound => &self.outbound_label,
        }
    }

    /// Each label must be usable as a single directory name.
    fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("layout.events_dir", &self.events_dir),
            ("layout.inbound_label", &self.inbound_label),
            ("layout.outbound_label", &self.outbound_label),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty()
                || trimmed == "."
                || trimmed == ".."
                || trimmed.contains(['/', '\\'])
            {
                return Err(ConfigError::ConfigInvalid(format!(
                    "{} must be a single directory name, got '{}'",
                    key, value
                )));
            }
        }
        Ok(())
    }
}

/// Rules for skipping XML files found in the source directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Exact file names to skip.
    #[serde(default)]
    pub exclude_filenames: Vec<String>,

    /// Glob patterns matched against the file name.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub exclude_regex: Vec<String>,
}

/// Interactive prompt settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// How many invalid paths the operator may enter before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

impl OrganizerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.nfe-organizer.toml` in the current directory
    /// 3. Look for `~/.config/nfe-organizer/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is found but cannot be read,
    /// parsed or validated.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("nfe-organizer")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        if self.prompt.max_attempts == 0 {
            return Err(ConfigError::ConfigInvalid(
                "prompt.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Compile the filter rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Pre-compiled filter rules.
#[derive(Debug)]
pub struct CompiledFilters {
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = rules
            .exclude_regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exclude_filenames: rules.exclude_filenames.iter().cloned().collect(),
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Returns `false` when the file name hits any exclusion rule.
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.exclude_filenames.contains(file_name) {
            return false;
        }

        if self
            .exclude_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
        {
            return false;
        }

        !self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}
