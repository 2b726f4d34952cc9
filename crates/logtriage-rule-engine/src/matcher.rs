//! Compiled pattern matchers
//!
//! Every pattern of a rule is compiled once into a [`PatternMatcher`]. The
//! scanner only ever sees this one type, whatever syntax the rule author
//! used: regular expressions, literal keywords and keyword expressions all
//! answer the same two questions (does the line match, and which text
//! matched).

use crate::constants::{MAX_PATTERN_LENGTH, REGEX_DFA_SIZE_LIMIT, REGEX_SIZE_LIMIT};
use crate::expression::KeywordExpression;
use crate::{Result, RuleError};
use logtriage_core::RuleType;
use regex::{Regex, RegexBuilder};

pub(crate) fn check_length(pattern: &str) -> Result<()> {
    if pattern.chars().count() > MAX_PATTERN_LENGTH {
        return Err(RuleError::InvalidPattern(format!(
            "Pattern exceeds maximum length of {} characters",
            MAX_PATTERN_LENGTH
        )));
    }
    Ok(())
}

fn build_case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_DFA_SIZE_LIMIT)
        .build()
        .map_err(|e| RuleError::InvalidPattern(e.to_string()))
}

/// Compile a case-insensitive regex with size limits to prevent ReDoS attacks
///
/// - Pattern length limit (500 characters)
/// - Compiled regex size limit (10MB)
/// - DFA size limit (2MB)
pub(crate) fn compile_regex_safe(pattern: &str) -> Result<Regex> {
    check_length(pattern)?;
    build_case_insensitive(pattern)
}

/// Compile a literal as a case-insensitive matcher.
///
/// The literal is escaped first, so regex metacharacters are plain text.
/// The length limit applies to the literal, not to its escaped form.
pub(crate) fn compile_literal(literal: &str) -> Result<Regex> {
    check_length(literal)?;
    build_case_insensitive(&regex::escape(literal))
}

/// One compiled pattern.
#[derive(Debug, Clone)]
pub enum PatternMatcher {
    /// Case-insensitive regular expression.
    Regex { source: String, regex: Regex },
    /// Case-insensitive literal substring.
    Literal { source: String, regex: Regex },
    /// Boolean keyword expression.
    Expression(KeywordExpression),
}

impl PatternMatcher {
    /// Compile `pattern` with the given syntax.
    pub fn compile(pattern: &str, rule_type: RuleType) -> Result<Self> {
        if pattern.is_empty() {
            return Err(RuleError::InvalidPattern("Pattern is empty".to_string()));
        }

        match rule_type {
            RuleType::Regex => Ok(PatternMatcher::Regex {
                source: pattern.to_string(),
                regex: compile_regex_safe(pattern)?,
            }),
            RuleType::Keyword => Ok(PatternMatcher::Literal {
                source: pattern.to_string(),
                regex: compile_literal(pattern)?,
            }),
            RuleType::Dsl => Ok(PatternMatcher::Expression(KeywordExpression::parse(pattern)?)),
        }
    }

    /// The pattern text as written in the rule.
    pub fn source(&self) -> &str {
        match self {
            PatternMatcher::Regex { source, .. } | PatternMatcher::Literal { source, .. } => source,
            PatternMatcher::Expression(expr) => expr.source(),
        }
    }

    /// Check whether the pattern matches anywhere in `line`.
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            PatternMatcher::Regex { regex, .. } | PatternMatcher::Literal { regex, .. } => {
                regex.is_match(line)
            }
            PatternMatcher::Expression(expr) => expr.evaluate(line),
        }
    }

    /// Return the text that made the pattern match, or `None` if it does not.
    ///
    /// For regexes and literals this is the leftmost match. For keyword
    /// expressions it is the leftmost keyword from a part of the expression
    /// that holds, or the expression source when it holds only through
    /// negation.
    pub fn find<'l>(&'l self, line: &'l str) -> Option<&'l str> {
        match self {
            PatternMatcher::Regex { regex, .. } | PatternMatcher::Literal { regex, .. } => {
                regex.find(line).map(|m| m.as_str())
            }
            PatternMatcher::Expression(expr) => expr.find(line),
        }
    }
}
