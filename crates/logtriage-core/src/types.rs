//! Core data types for log triage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A detection rule as delivered by the external rule store.
///
/// Field names and defaults follow the rule payloads of the triage service.
/// `operator` stays a raw string on the wire; it is parsed into an
/// [`Operator`] when the rule is compiled, so one malformed rule cannot
/// poison a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Rule identifier in the rule store.
    #[serde(default)]
    pub id: i64,

    /// Display name, copied onto every issue.
    pub name: String,

    /// Display description, copied onto every issue.
    #[serde(default)]
    pub description: String,

    /// Disabled rules never reach a compiled snapshot.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Ordered patterns combined by `operator`.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// `"AND"`, `"OR"` or `"NOT"`.
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Whether patterns are regular expressions (ignored when `rule_type` is set).
    #[serde(default = "default_true")]
    pub is_regex: bool,

    /// Organizational metadata, irrelevant to matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,

    /// Explicit pattern syntax; overrides `is_regex` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<RuleType>,

    /// Explicit severity; derived from the rule name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Loader ordering hint (higher = evaluated first).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_operator() -> String {
    Operator::Or.as_str().to_string()
}

impl Rule {
    /// Create an enabled `OR` rule with the given patterns.
    pub fn new(id: i64, name: impl Into<String>, patterns: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            enabled: true,
            patterns,
            operator: default_operator(),
            is_regex: true,
            folder_id: None,
            rule_type: None,
            severity: None,
            priority: None,
        }
    }

    /// The pattern syntax this rule is compiled with.
    pub fn effective_rule_type(&self) -> RuleType {
        match self.rule_type {
            Some(rule_type) => rule_type,
            None if self.is_regex => RuleType::Regex,
            None => RuleType::Keyword,
        }
    }

    /// The severity assigned to issues produced by this rule.
    pub fn effective_severity(&self) -> Severity {
        self.severity
            .unwrap_or_else(|| Severity::for_rule_name(&self.name))
    }
}

/// How the patterns of one rule combine against a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    /// Any pattern matches.
    Or,
    /// Every pattern matches.
    And,
    /// No pattern matches.
    Not,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Or => "OR",
            Operator::And => "AND",
            Operator::Not => "NOT",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator string outside `AND`/`OR`/`NOT`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown operator '{0}' (expected AND, OR or NOT)")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    /// Parses case-insensitively, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OR" => Ok(Operator::Or),
            "AND" => Ok(Operator::And),
            "NOT" => Ok(Operator::Not),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// Pattern syntax of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Case-insensitive literal substring.
    Keyword,
    /// Case-insensitive regular expression.
    Regex,
    /// Boolean keyword expression (`"a" & !"b" | c`).
    Dsl,
}

/// Issue severity as shown by the dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

impl Severity {
    /// Name heuristic used when a rule carries no explicit severity:
    /// kernel panics and OOM kills are high, everything else medium.
    pub fn for_rule_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("panic") || lower.contains("oom") {
            Severity::High
        } else {
            Severity::Medium
        }
    }
}

/// Log level detected on a matched line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

/// One match produced by one rule against one line.
///
/// Rule identity and text are copied at match time, so a result stays a
/// frozen view regardless of later rule edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Identifier of the rule that fired.
    #[serde(default)]
    pub rule_id: i64,

    pub rule_name: String,

    #[serde(default)]
    pub description: String,

    /// Text span that triggered the match, or the rule name for `NOT` rules.
    pub matched_text: String,

    /// 1-based line in the source content.
    pub line_number: usize,

    /// Lines `[line_number - W, line_number + W]`, clamped, joined by `\n`.
    pub context: String,

    pub severity: Severity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

impl Issue {
    /// The grouping key of this issue.
    pub fn type_key(&self) -> TypeKey {
        TypeKey::new(&self.matched_text, &self.rule_name, &self.description)
    }
}

/// Grouping key `(matched_text_or_rule_name, description)`.
///
/// The string form (`Display`) is the key used both in
/// [`Summary::by_type`] and for problem-library lookups: the label alone
/// when the description is empty, otherwise `"label | description"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeKey {
    pub label: String,
    pub description: String,
}

impl TypeKey {
    /// Build a key, falling back to `rule_name` when `matched_text` is empty.
    pub fn new(matched_text: &str, rule_name: &str, description: &str) -> Self {
        let label = if matched_text.is_empty() {
            rule_name
        } else {
            matched_text
        };
        Self {
            label: label.to_string(),
            description: description.to_string(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            f.write_str(&self.label)
        } else {
            write!(f, "{} | {}", self.label, self.description)
        }
    }
}

/// Summary counts of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Always `issues.len()`.
    pub total_issues: usize,

    #[serde(default)]
    pub high_severity: usize,

    #[serde(default)]
    pub medium_severity: usize,

    /// Type key string to issue count; values sum to `total_issues`.
    #[serde(default)]
    pub by_type: BTreeMap<String, usize>,
}

/// The complete output of scanning one input against one rule snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub file_id: Option<String>,

    pub filename: String,

    pub analysis_time: DateTime<Utc>,

    pub summary: Summary,

    /// Ordered by `(line_number, rule declaration order)`.
    pub issues: Vec<Issue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_wire_defaults() {
        let rule: Rule = serde_json::from_str(r#"{"name": "OOM", "patterns": ["oom"]}"#).unwrap();
        assert!(rule.enabled);
        assert!(rule.is_regex);
        assert_eq!(rule.operator, "OR");
        assert_eq!(rule.description, "");
        assert_eq!(rule.effective_rule_type(), RuleType::Regex);
    }

    #[test]
    fn test_rule_type_overrides_is_regex() {
        let mut rule = Rule::new(1, "x", vec!["a".into()]);
        rule.is_regex = false;
        assert_eq!(rule.effective_rule_type(), RuleType::Keyword);
        rule.rule_type = Some(RuleType::Dsl);
        assert_eq!(rule.effective_rule_type(), RuleType::Dsl);
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("OR".parse::<Operator>().unwrap(), Operator::Or);
        assert_eq!(" and ".parse::<Operator>().unwrap(), Operator::And);
        assert_eq!("Not".parse::<Operator>().unwrap(), Operator::Not);
        assert_eq!(
            "XOR".parse::<Operator>().unwrap_err(),
            UnknownOperator("XOR".to_string())
        );
    }

    #[test]
    fn test_severity_from_name() {
        assert_eq!(Severity::for_rule_name("Kernel Panic"), Severity::High);
        assert_eq!(Severity::for_rule_name("OOM Killer"), Severity::High);
        assert_eq!(Severity::for_rule_name("Network Error"), Severity::Medium);

        let mut rule = Rule::new(1, "Network Error", vec![]);
        rule.severity = Some(Severity::High);
        assert_eq!(rule.effective_severity(), Severity::High);
    }

    #[test]
    fn test_type_key_string_form() {
        assert_eq!(TypeKey::new("OOM", "OOM Killer", "").to_string(), "OOM");
        assert_eq!(
            TypeKey::new("", "Quiet", "no debug output").to_string(),
            "Quiet | no debug output"
        );
    }

    #[test]
    fn test_issue_serializes_wire_fields() {
        let issue = Issue {
            rule_id: 3,
            rule_name: "OOM".into(),
            description: "memory".into(),
            matched_text: "OOM".into(),
            line_number: 10,
            context: "OOM killer invoked".into(),
            severity: Severity::High,
            level: None,
        };
        let value = serde_json::to_value(&issue).unwrap();
        for field in ["rule_name", "description", "matched_text", "line_number", "context"] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert!(value.get("level").is_none());
        assert_eq!(value["severity"], "high");
    }
}
