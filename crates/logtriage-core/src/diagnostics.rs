//! Non-fatal diagnostics reported alongside a successful analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One rule could not be compiled and was left out of the snapshot.
///
/// Compilation failures are isolated per rule; the remaining rules still
/// form a usable snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Rule {rule_id} ('{rule_name}'): {reason}")]
pub struct RuleCompilationError {
    pub rule_id: i64,
    pub rule_name: String,
    /// The offending pattern, when the failure is tied to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub reason: String,
}

impl RuleCompilationError {
    pub fn new(rule_id: i64, rule_name: &str, reason: impl Into<String>) -> Self {
        Self {
            rule_id,
            rule_name: rule_name.to_string(),
            pattern: None,
            reason: reason.into(),
        }
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }
}

/// A byte range that was not valid UTF-8 and was replaced with U+FFFD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeWarning {
    /// 1-based line containing the range.
    pub line_number: usize,
    /// Offset of the first invalid byte from the start of the input.
    pub byte_offset: u64,
    /// Number of bytes replaced.
    pub byte_len: usize,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid UTF-8 on line {}: {} byte(s) at offset {} replaced",
            self.line_number, self.byte_len, self.byte_offset
        )
    }
}

/// Why a scan stopped before the end of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Cancellation was requested through the scan's token.
    Requested,
    /// The input exceeded the configured byte budget.
    ByteBudget,
    /// The host's wall-clock budget ran out.
    Deadline,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CancelReason::Requested => "cancellation requested",
            CancelReason::ByteBudget => "byte budget exceeded",
            CancelReason::Deadline => "deadline exceeded",
        };
        f.write_str(s)
    }
}
