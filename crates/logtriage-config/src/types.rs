use logtriage_scan::{ScanOptions, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_INPUT_BYTES, MAX_CONTEXT_WINDOW};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::manager::ConfigError;

/// Main configuration structure for logtriage
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub analysis: AnalysisSettings,

    #[serde(default)]
    pub bulk: BulkSettings,

    #[serde(default)]
    pub rules: RuleSettings,

    #[serde(default)]
    pub problems: ProblemSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Per-input analysis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSettings {
    /// Lines of context on each side of a match
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Input budget in bytes; 0 disables the limit
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,

    /// Attach a heuristic log level to each issue
    #[serde(default = "default_true")]
    pub include_line_level: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            max_input_bytes: default_max_input_bytes(),
            include_line_level: default_true(),
        }
    }
}

/// Settings for analyzing many files at once
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BulkSettings {
    /// Max files analyzed concurrently
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Wall-clock budget per file, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            timeout_secs: None,
        }
    }
}

/// Where rules come from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSettings {
    /// Rule files or directories of rule files
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Include the built-in detectors
    #[serde(default = "default_true")]
    pub include_builtin: bool,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            include_builtin: default_true(),
        }
    }
}

/// Problem library location
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProblemSettings {
    /// JSON export of the problem library
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `"logtriage_scan=debug,warn"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl EngineConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bulk.max_concurrent == 0 {
            return Err(ConfigError::Invalid(
                "bulk.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.analysis.context_window > MAX_CONTEXT_WINDOW {
            return Err(ConfigError::Invalid(format!(
                "analysis.context_window must be at most {}, got {}",
                MAX_CONTEXT_WINDOW, self.analysis.context_window
            )));
        }
        if self.bulk.timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "bulk.timeout_secs must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Scan options for the analyzer
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            context_window: self.analysis.context_window,
            max_input_bytes: match self.analysis.max_input_bytes {
                0 => None,
                limit => Some(limit),
            },
            include_line_level: self.analysis.include_line_level,
        }
    }

    pub fn bulk_timeout(&self) -> Option<Duration> {
        self.bulk.timeout_secs.map(Duration::from_secs)
    }
}

fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}

fn default_max_input_bytes() -> u64 {
    DEFAULT_MAX_INPUT_BYTES
}

fn default_max_concurrent() -> usize {
    logtriage_scan::default_concurrency()
}

fn default_true() -> bool {
    true
}
