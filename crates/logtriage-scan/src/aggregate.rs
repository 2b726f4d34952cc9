//! Issue aggregation
//!
//! Turns contextual hits into [`Issue`]s in `(line_number, rule order)` and
//! computes the summary counts.

use crate::context::ContextualHit;
use chrono::{DateTime, Utc};
use logtriage_core::{AnalysisResult, Issue, Severity, Summary};
use logtriage_rule_engine::CompiledRuleSet;

/// Summary counts for a list of issues.
pub fn summarize(issues: &[Issue]) -> Summary {
    let mut summary = Summary {
        total_issues: issues.len(),
        ..Summary::default()
    };

    for issue in issues {
        match issue.severity {
            Severity::High => summary.high_severity += 1,
            Severity::Medium => summary.medium_severity += 1,
        }
        *summary
            .by_type
            .entry(issue.type_key().to_string())
            .or_insert(0) += 1;
    }

    summary
}

/// Collects issues for one analysis.
#[derive(Debug)]
pub struct IssueAggregator<'s> {
    snapshot: &'s CompiledRuleSet,
    issues: Vec<(usize, Issue)>,
}

impl<'s> IssueAggregator<'s> {
    pub fn new(snapshot: &'s CompiledRuleSet) -> Self {
        Self {
            snapshot,
            issues: Vec::new(),
        }
    }

    /// Record one hit, copying the firing rule's identity onto the issue.
    pub fn push(&mut self, contextual: ContextualHit) {
        let ContextualHit { hit, context } = contextual;
        let Some(rule) = self.snapshot.rules().get(hit.rule_index) else {
            return;
        };

        let issue = Issue {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            description: rule.description.clone(),
            matched_text: hit.matched_text,
            line_number: hit.line_number,
            context,
            severity: rule.severity,
            level: hit.level,
        };
        self.issues.push((hit.rule_index, issue));
    }

    pub fn extend<I: IntoIterator<Item = ContextualHit>>(&mut self, hits: I) {
        for hit in hits {
            self.push(hit);
        }
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Order the issues and build the result.
    pub fn finish(
        mut self,
        filename: impl Into<String>,
        file_id: Option<String>,
        analysis_time: DateTime<Utc>,
    ) -> AnalysisResult {
        self.issues
            .sort_by_key(|(rule_index, issue)| (issue.line_number, *rule_index));
        let issues: Vec<Issue> = self.issues.into_iter().map(|(_, issue)| issue).collect();

        AnalysisResult {
            file_id,
            filename: filename.into(),
            analysis_time,
            summary: summarize(&issues),
            issues,
        }
    }
}
