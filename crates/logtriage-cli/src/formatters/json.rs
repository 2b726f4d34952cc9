//! JSON formatter.

use super::Formatter;
use crate::commands::analyze::InputOutcome;
use crate::commands::rules::RuleCheck;
use anyhow::{Context, Result};
use logtriage_core::{ProblemStats, Rule};
use serde::Serialize;

pub struct JsonFormatter;

fn pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Error serializing results")
}

impl Formatter for JsonFormatter {
    fn analysis(&self, outcomes: &[InputOutcome]) -> Result<String> {
        pretty(outcomes)
    }

    fn rules(&self, rules: &[Rule]) -> Result<String> {
        pretty(rules)
    }

    fn rule_check(&self, check: &RuleCheck) -> Result<String> {
        pretty(check)
    }

    fn stats(&self, stats: &ProblemStats) -> Result<String> {
        pretty(stats)
    }
}
