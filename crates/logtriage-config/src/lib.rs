//! Configuration for logtriage: a TOML file with analysis, bulk, rule,
//! problem-library and logging sections.

pub mod manager;
pub mod types;

pub use manager::{ConfigError, ConfigManager};
pub use types::{
    AnalysisSettings, BulkSettings, EngineConfig, LoggingSettings, ProblemSettings, RuleSettings,
};
