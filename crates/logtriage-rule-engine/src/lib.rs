//! logtriage rule engine - compiles detection rules into line matchers
//!
//! Rules arrive as plain configuration ([`logtriage_core::Rule`]) and are
//! compiled once into an immutable [`CompiledRuleSet`] that concurrent scans
//! share through an `Arc`.
//!
//! # Architecture
//!
//! - **Pattern matchers**: regex, literal and keyword-expression patterns
//!   behind one [`PatternMatcher`] type
//! - **Compiled rules**: matchers plus an `OR`/`AND`/`NOT` combinator
//! - **Snapshot cache**: identical rule sets share one compiled snapshot
//! - **Multi-source loading**: built-in catalog + JSON/TOML rule files
//!
//! # Example
//!
//! ```toml
//! # rules/network.toml
//! [[rules]]
//! id = 20
//! name = "Connection timeout"
//! operator = "AND"
//! is_regex = false
//! patterns = ["Connection", "timeout"]
//! ```

pub mod built_in;
pub mod cache;
pub mod compiler;
pub mod constants;
pub mod expression;
pub mod loader;
pub mod matcher;

pub use built_in::builtin_rules;
pub use cache::{fingerprint, SnapshotCache};
pub use compiler::{Compilation, CompiledRule, CompiledRuleSet};
pub use constants::*;
pub use expression::KeywordExpression;
pub use loader::{parse_rules, sort_rules, RuleFormat, RuleLoader};
pub use matcher::PatternMatcher;

/// Result type for rule operations
pub type Result<T> = std::result::Result<T, RuleError>;

/// Error types for rule engine
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Failed to load rules from {path}: {source}")]
    LoadError {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Rule file {path} is {size} bytes (limit {limit})")]
    FileTooLarge { path: String, size: u64, limit: u64 },

    #[error("Unsupported rule file format: {0} (expected .json or .toml)")]
    UnsupportedFormat(String),

    #[error("Invalid TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
