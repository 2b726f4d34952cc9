//! Output formatters for analysis results, rule sets and problem counts.

pub mod human;
pub mod json;

use crate::commands::analyze::InputOutcome;
use crate::commands::rules::RuleCheck;
use crate::OutputFormat;
use anyhow::Result;
use logtriage_core::{ProblemStats, Rule};

pub use human::HumanFormatter;
pub use json::JsonFormatter;

/// Renders command output to a string
pub trait Formatter {
    fn analysis(&self, outcomes: &[InputOutcome]) -> Result<String>;

    fn rules(&self, rules: &[Rule]) -> Result<String>;

    fn rule_check(&self, check: &RuleCheck) -> Result<String>;

    fn stats(&self, stats: &ProblemStats) -> Result<String>;
}

pub fn formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
