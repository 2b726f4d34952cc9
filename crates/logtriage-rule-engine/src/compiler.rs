//! Rule compilation
//!
//! Turns rule configuration into an immutable [`CompiledRuleSet`]. A rule
//! that fails to compile is dropped from the snapshot and reported as a
//! [`RuleCompilationError`]; it never prevents the other rules from
//! compiling.

use crate::matcher::PatternMatcher;
use logtriage_core::{Operator, Rule, RuleCompilationError, Severity};
use std::sync::Arc;
use tracing::{debug, warn};

/// A rule ready for line evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub operator: Operator,
    matchers: Vec<PatternMatcher>,
}

impl CompiledRule {
    /// Compile one rule.
    ///
    /// The caller is responsible for skipping disabled rules.
    pub fn compile(rule: &Rule) -> Result<Self, RuleCompilationError> {
        let operator: Operator = rule
            .operator
            .parse()
            .map_err(|e: logtriage_core::UnknownOperator| {
                RuleCompilationError::new(rule.id, &rule.name, e.to_string())
            })?;

        if rule.patterns.is_empty() {
            return Err(RuleCompilationError::new(
                rule.id,
                &rule.name,
                "Rule has no patterns",
            ));
        }

        let rule_type = rule.effective_rule_type();
        let matchers = rule
            .patterns
            .iter()
            .map(|pattern| {
                PatternMatcher::compile(pattern, rule_type).map_err(|e| {
                    RuleCompilationError::new(rule.id, &rule.name, e.to_string())
                        .with_pattern(pattern)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: rule.id,
            name: rule.name.clone(),
            description: rule.description.clone(),
            severity: rule.effective_severity(),
            operator,
            matchers,
        })
    }

    /// Evaluate the rule against one line.
    ///
    /// Returns the matched text when the rule fires:
    /// - `OR`: the match of the first pattern (in declared order) that matches
    /// - `AND`: the match of the first pattern, provided every pattern matches
    /// - `NOT`: the rule name, provided no pattern matches
    pub fn evaluate<'a>(&'a self, line: &'a str) -> Option<&'a str> {
        match self.operator {
            Operator::Or => self.matchers.iter().find_map(|m| m.find(line)),
            Operator::And => {
                let (first, rest) = self.matchers.split_first()?;
                let text = first.find(line)?;
                rest.iter().all(|m| m.is_match(line)).then_some(text)
            }
            Operator::Not => {
                if self.matchers.iter().any(|m| m.is_match(line)) {
                    None
                } else {
                    Some(self.name.as_str())
                }
            }
        }
    }

    pub fn matchers(&self) -> &[PatternMatcher] {
        &self.matchers
    }
}

/// An immutable, shareable set of compiled rules.
///
/// Rules keep the order in which they were handed to [`CompiledRuleSet::compile`];
/// that order breaks ties between issues on the same line.
#[derive(Debug, Clone, Default)]
pub struct CompiledRuleSet {
    rules: Vec<CompiledRule>,
}

/// The outcome of compiling a batch of rules.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub snapshot: Arc<CompiledRuleSet>,
    pub errors: Vec<RuleCompilationError>,
}

impl CompiledRuleSet {
    /// Compile every enabled rule, isolating per-rule failures.
    pub fn compile(rules: &[Rule]) -> Compilation {
        let mut compiled = Vec::with_capacity(rules.len());
        let mut errors = Vec::new();

        for rule in rules.iter().filter(|rule| rule.enabled) {
            match CompiledRule::compile(rule) {
                Ok(rule) => compiled.push(rule),
                Err(e) => {
                    warn!(
                        rule_id = e.rule_id,
                        rule_name = %e.rule_name,
                        pattern = e.pattern.as_deref().unwrap_or(""),
                        reason = %e.reason,
                        "dropping rule that failed to compile"
                    );
                    errors.push(e);
                }
            }
        }

        debug!(
            compiled = compiled.len(),
            failed = errors.len(),
            disabled = rules.iter().filter(|rule| !rule.enabled).count(),
            "compiled rule snapshot"
        );

        Compilation {
            snapshot: Arc::new(Self { rules: compiled }),
            errors,
        }
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
