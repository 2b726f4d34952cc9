//! Human-readable formatter.

use super::Formatter;
use crate::commands::analyze::InputOutcome;
use crate::commands::rules::RuleCheck;
use anyhow::Result;
use colored::Colorize;
use logtriage_core::{Issue, ProblemStats, Rule, Severity};
use logtriage_scan::{AnalysisReport, RunStatus};
use std::collections::BTreeMap;
use std::fmt::Write;

pub struct HumanFormatter;

impl Formatter for HumanFormatter {
    fn analysis(&self, outcomes: &[InputOutcome]) -> Result<String> {
        let mut out = String::new();
        for outcome in outcomes {
            write_outcome(&mut out, outcome)?;
        }

        if outcomes.len() > 1 {
            let issues: usize = outcomes
                .iter()
                .filter_map(|o| o.report.as_ref())
                .map(|r| r.result.summary.total_issues)
                .sum();
            let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
            writeln!(
                out,
                "{} input(s), {} issue(s), {} failed",
                outcomes.len(),
                issues,
                failed
            )?;
        }
        Ok(out.trim_end().to_string())
    }

    fn rules(&self, rules: &[Rule]) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{}", "Rules".bold())?;
        writeln!(out, "{}", "=".repeat(60))?;

        for rule in rules {
            let status = if rule.enabled {
                "✓".green()
            } else {
                "✗".red()
            };
            writeln!(
                out,
                "{} {:>4}  {}  [{} {:?}, {}]",
                status,
                rule.id,
                rule.name.bold(),
                rule.operator,
                rule.effective_rule_type(),
                severity_label(rule.effective_severity())
            )?;
            if !rule.description.is_empty() {
                writeln!(out, "        {}", rule.description.dimmed())?;
            }
            for pattern in &rule.patterns {
                writeln!(out, "        - {}", pattern)?;
            }
        }

        let enabled = rules.iter().filter(|r| r.enabled).count();
        writeln!(out, "\nTotal: {} rule(s), {} enabled", rules.len(), enabled)?;
        Ok(out.trim_end().to_string())
    }

    fn rule_check(&self, check: &RuleCheck) -> Result<String> {
        let mut out = String::new();
        for error in &check.errors {
            writeln!(out, "{} {}", "✗".red(), error)?;
            if let Some(pattern) = &error.pattern {
                writeln!(out, "    pattern: {}", pattern)?;
            }
        }

        let line = format!(
            "{} of {} rule(s) compiled, {} failed",
            check.compiled,
            check.loaded,
            check.errors.len()
        );
        if check.is_clean() {
            writeln!(out, "{} {}", "✓".green(), line)?;
        } else {
            writeln!(out, "{}", line.red())?;
        }
        Ok(out.trim_end().to_string())
    }

    fn stats(&self, stats: &ProblemStats) -> Result<String> {
        let mut out = String::new();
        writeln!(out, "{}", "Problem Library".bold())?;
        writeln!(out, "  Total: {}", stats.total)?;
        if !stats.by_type.is_empty() {
            writeln!(out, "  By type:")?;
            write_counts(&mut out, &stats.by_type, None)?;
        }
        Ok(out.trim_end().to_string())
    }
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::High => "HIGH".red().bold().to_string(),
        Severity::Medium => "MEDIUM".yellow().to_string(),
    }
}

fn write_outcome(out: &mut String, outcome: &InputOutcome) -> Result<()> {
    writeln!(out, "\n{}", outcome.source.bold())?;
    writeln!(out, "{}", "=".repeat(outcome.source.chars().count().max(8)))?;

    if let Some(error) = &outcome.error {
        writeln!(out, "{} {}\n", "error:".red().bold(), error)?;
        return Ok(());
    }
    let Some(report) = &outcome.report else {
        return Ok(());
    };

    write_report(out, report, outcome.problem_links.as_ref())
}

fn write_report(
    out: &mut String,
    report: &AnalysisReport,
    links: Option<&BTreeMap<String, usize>>,
) -> Result<()> {
    let result = &report.result;

    match report.status {
        RunStatus::Complete => {}
        RunStatus::Cancelled { reason, at_line } => {
            writeln!(
                out,
                "{}",
                format!("Incomplete: {} after line {}", reason, at_line).yellow()
            )?;
        }
        RunStatus::Truncated { at_line, .. } => {
            writeln!(
                out,
                "{}",
                format!(
                    "Incomplete: read failed after line {}: {}",
                    at_line,
                    report.read_error.as_deref().unwrap_or("unknown error")
                )
                .yellow()
            )?;
        }
    }

    writeln!(
        out,
        "Lines: {}  Bytes: {}  File id: {}",
        report.lines_scanned,
        report.bytes_scanned,
        result.file_id.as_deref().unwrap_or("-")
    )?;

    let summary = &result.summary;
    writeln!(
        out,
        "Issues: {} ({} high, {} medium)",
        summary.total_issues, summary.high_severity, summary.medium_severity
    )?;

    if !summary.by_type.is_empty() {
        writeln!(out, "\nBy type:")?;
        write_counts(out, &summary.by_type, links)?;
    }

    if !result.issues.is_empty() {
        writeln!(out, "\nIssues:")?;
        for issue in &result.issues {
            write_issue(out, issue)?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out, "\n{}", "Warnings:".yellow())?;
        for warning in &report.warnings {
            writeln!(out, "  {}", warning)?;
        }
    }

    if !report.rule_errors.is_empty() {
        writeln!(out, "\n{}", "Skipped rules:".yellow())?;
        for error in &report.rule_errors {
            writeln!(out, "  {}", error)?;
        }
    }

    writeln!(out)?;
    Ok(())
}

fn type_label(key: &str) -> &str {
    if key.is_empty() {
        "(untyped)"
    } else {
        key
    }
}

fn write_counts(
    out: &mut String,
    counts: &BTreeMap<String, usize>,
    links: Option<&BTreeMap<String, usize>>,
) -> Result<()> {
    for (key, count) in counts {
        match links.and_then(|l| l.get(key)) {
            Some(docs) => writeln!(
                out,
                "  {}: {}  {}",
                type_label(key),
                count,
                format!("[{} doc(s)]", docs).cyan()
            )?,
            None => writeln!(out, "  {}: {}", type_label(key), count)?,
        }
    }
    Ok(())
}

fn write_issue(out: &mut String, issue: &Issue) -> Result<()> {
    let level = issue
        .level
        .map(|l| format!(" ({:?})", l).to_lowercase())
        .unwrap_or_default();

    writeln!(
        out,
        "  {} {}  {}  matched {:?}{}",
        severity_label(issue.severity),
        format!("line {}", issue.line_number).bold(),
        issue.rule_name,
        issue.matched_text,
        level
    )?;

    for line in issue.context.lines() {
        writeln!(out, "      {}", line.dimmed())?;
    }
    Ok(())
}
