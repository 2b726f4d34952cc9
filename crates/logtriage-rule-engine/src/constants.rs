//! Security and performance constants for the rule engine
//!
//! These constants define limits to prevent various attack vectors:
//! - ReDoS (Regular Expression Denial of Service)
//! - Memory exhaustion
//! - Excessive recursion

/// Maximum size for rule files (1MB)
///
/// Rationale: rule files are small configuration files. Larger files may
/// indicate malicious content or misconfiguration.
pub const MAX_RULE_FILE_SIZE: u64 = 1_048_576; // 1MB

/// Maximum pattern length (500 characters)
///
/// Applies to regex, literal and keyword-expression patterns alike.
pub const MAX_PATTERN_LENGTH: usize = 500;

/// Compiled regex size limit (10MB)
///
/// Applied during regex compilation via RegexBuilder.
pub const REGEX_SIZE_LIMIT: usize = 10_000_000; // 10MB

/// Regex DFA size limit (2MB)
pub const REGEX_DFA_SIZE_LIMIT: usize = 2_000_000; // 2MB

/// Maximum directory traversal depth when loading rule directories
pub const MAX_DIRECTORY_DEPTH: usize = 10;

/// Maximum nesting depth of a keyword expression
///
/// The expression parser is recursive; deeper input is rejected instead of
/// risking a stack overflow.
pub const MAX_EXPRESSION_DEPTH: usize = 64;

/// Number of compiled snapshots kept by [`crate::SnapshotCache`] by default
pub const DEFAULT_SNAPSHOT_CACHE_CAPACITY: usize = 16;
