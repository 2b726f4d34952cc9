//! Built-in detection rules embedded in the binary
//!
//! The default catalog covers the usual suspects in system logs (OOM kills,
//! kernel panics, segfaults, disk, network, filesystem and authentication
//! failures). It is embedded at compile time via `include_str!()` for
//! zero-config defaults.

use crate::loader::{parse_rules, RuleFormat};
use crate::Result;
use logtriage_core::Rule;

/// Default detectors
pub const DEFAULT_RULES: &str = include_str!("built_in/default.toml");

/// Load the built-in rule catalog
///
/// # Example
///
/// ```
/// use logtriage_rule_engine::builtin_rules;
///
/// let rules = builtin_rules().expect("built-in rules parse");
/// assert_eq!(rules.len(), 7);
/// ```
pub fn builtin_rules() -> Result<Vec<Rule>> {
    parse_rules(DEFAULT_RULES, RuleFormat::Toml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompiledRuleSet;
    use logtriage_core::{Operator, RuleType, Severity};

    #[test]
    fn test_builtin_rules_compile_cleanly() {
        let rules = builtin_rules().unwrap();
        let compilation = CompiledRuleSet::compile(&rules);
        assert!(compilation.errors.is_empty(), "{:?}", compilation.errors);
        assert_eq!(compilation.snapshot.len(), 7);
    }

    #[test]
    fn test_builtin_rules_are_enabled_regex_or() {
        for rule in builtin_rules().unwrap() {
            assert!(rule.enabled, "{} should be enabled", rule.name);
            assert_eq!(rule.effective_rule_type(), RuleType::Regex);
            assert_eq!(rule.operator.parse::<Operator>().unwrap(), Operator::Or);
            assert!(!rule.description.is_empty());
        }
    }

    #[test]
    fn test_builtin_severities() {
        let rules = builtin_rules().unwrap();
        let high: Vec<_> = rules
            .iter()
            .filter(|r| r.effective_severity() == Severity::High)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(high, vec!["OOM Killer", "Kernel Panic"]);
    }

    #[test]
    fn test_builtin_rules_detect_typical_lines() {
        let compilation = CompiledRuleSet::compile(&builtin_rules().unwrap());
        let samples = [
            ("kernel: Out of memory: Killed process 1234 (java)", "OOM Killer"),
            ("Kernel panic - not syncing: Fatal exception", "Kernel Panic"),
            ("app[42]: segfault at 0 ip 00007f", "Segmentation Fault"),
            ("write failed: No space left on device", "Disk Space Error"),
            ("connect(): Connection refused", "Network Error"),
            ("blk_update_request: I/O error, dev sda", "File System Error"),
            ("sshd: authentication failed for root", "Authentication Error"),
        ];

        for (line, expected) in samples {
            let fired: Vec<_> = compilation
                .snapshot
                .rules()
                .iter()
                .filter(|rule| rule.evaluate(line).is_some())
                .map(|rule| rule.name.as_str())
                .collect();
            assert_eq!(fired, vec![expected], "line: {line}");
        }
    }
}
