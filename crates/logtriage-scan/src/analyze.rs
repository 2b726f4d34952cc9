//! Single-input analysis
//!
//! One input is one sequential pass: decode a line, check for
//! cancellation, scan it, feed the context extractor, hand completed hits
//! to the aggregator. Nothing but the rule snapshot is shared with other
//! analyses.

use crate::aggregate::IssueAggregator;
use crate::cancellation::CancellationToken;
use crate::context::ContextExtractor;
use crate::decode::LineReader;
use crate::scanner::LineScanner;
use chrono::Utc;
use logtriage_core::{
    AnalysisResult, CancelReason, DecodeWarning, Error, FatalInputError, Result, Rule,
    RuleCompilationError,
};
use logtriage_rule_engine::{Compilation, CompiledRuleSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{self, BufRead};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lines of context on each side of a match
pub const DEFAULT_CONTEXT_WINDOW: usize = 2;

/// Largest accepted context window
pub const MAX_CONTEXT_WINDOW: usize = 100;

/// Default input budget (5MB)
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 5 * 1024 * 1024;

/// Hex characters of the content hash used as a derived file id
const FILE_ID_LEN: usize = 16;

/// Derive a stable file id from content.
pub fn file_id_for(content: &[u8]) -> String {
    let mut digest = hex::encode(Sha256::digest(content));
    digest.truncate(FILE_ID_LEN);
    digest
}

/// Per-analysis knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// `W`: lines of context before and after each match.
    pub context_window: usize,
    /// Stop once more than this many bytes were read.
    pub max_input_bytes: Option<u64>,
    /// Attach a heuristic log level to each issue.
    pub include_line_level: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_input_bytes: Some(DEFAULT_MAX_INPUT_BYTES),
            include_line_level: true,
        }
    }
}

/// How an analysis ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    /// The result covers lines `1..=at_line` only.
    Cancelled { reason: CancelReason, at_line: usize },
    /// Reading failed after `bytes_read` bytes; the result covers lines
    /// `1..=at_line` only.
    Truncated { at_line: usize, bytes_read: u64 },
}

/// Result of one analysis plus everything recovered along the way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub result: AnalysisResult,
    pub status: RunStatus,
    #[serde(default)]
    pub warnings: Vec<DecodeWarning>,
    #[serde(default)]
    pub rule_errors: Vec<RuleCompilationError>,
    pub lines_scanned: usize,
    pub bytes_scanned: u64,
    /// The read error that truncated the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_error: Option<String>,
}

impl AnalysisReport {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    /// The result of a complete run.
    ///
    /// A cancelled run becomes [`Error::Cancelled`], a truncated one
    /// [`FatalInputError::Read`].
    pub fn into_complete(self) -> Result<AnalysisResult> {
        match self.status {
            RunStatus::Complete => Ok(self.result),
            RunStatus::Cancelled { reason, .. } => Err(Error::Cancelled {
                reason,
                lines_scanned: self.lines_scanned,
            }),
            RunStatus::Truncated { bytes_read, .. } => Err(FatalInputError::Read {
                bytes_read,
                source: io::Error::other(self.read_error.unwrap_or_default()),
            }
            .into()),
        }
    }
}

/// Analyzes inputs against one compiled snapshot.
#[derive(Debug, Clone)]
pub struct Analyzer {
    snapshot: Arc<CompiledRuleSet>,
    rule_errors: Vec<RuleCompilationError>,
    options: ScanOptions,
}

impl Analyzer {
    pub fn new(compilation: Compilation) -> Self {
        Self {
            snapshot: compilation.snapshot,
            rule_errors: compilation.errors,
            options: ScanOptions::default(),
        }
    }

    /// Compile `rules` and analyze with the result.
    pub fn from_rules(rules: &[Rule]) -> Self {
        Self::new(CompiledRuleSet::compile(rules))
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn snapshot(&self) -> &Arc<CompiledRuleSet> {
        &self.snapshot
    }

    pub fn rule_errors(&self) -> &[RuleCompilationError] {
        &self.rule_errors
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Analyze an in-memory upload or pasted text.
    pub fn analyze_bytes(&self, content: &[u8], filename: &str) -> Result<AnalysisReport> {
        self.analyze_reader(content, filename, None, &CancellationToken::new())
    }

    /// Analyze a stream.
    ///
    /// Without a `file_id`, one is derived from the SHA-256 of the bytes read.
    /// For a cancelled run that is a hash of the consumed prefix only.
    pub fn analyze_reader<R: BufRead>(
        &self,
        reader: R,
        filename: &str,
        file_id: Option<String>,
        token: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let analysis_time = Utc::now();
        let scanner =
            LineScanner::new(&self.snapshot).with_level_detection(self.options.include_line_level);
        let mut reader = LineReader::new(reader);
        let mut extractor = ContextExtractor::new(self.options.context_window);
        let mut aggregator = IssueAggregator::new(&self.snapshot);

        let mut status = RunStatus::Complete;
        let mut read_error = None;
        let mut lines_scanned = 0;
        let mut bytes_scanned = 0;

        loop {
            let line = match reader.next_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                // Nothing scanned yet: the input is unusable
                Err(source) if reader.bytes_read() == 0 => {
                    return Err(FatalInputError::Read {
                        bytes_read: 0,
                        source,
                    }
                    .into())
                }
                Err(e) => {
                    status = RunStatus::Truncated {
                        at_line: lines_scanned,
                        bytes_read: reader.bytes_read(),
                    };
                    read_error = Some(e.to_string());
                    break;
                }
            };

            let over_budget = self
                .options
                .max_input_bytes
                .is_some_and(|limit| reader.bytes_read() > limit);
            let cancelled = if over_budget {
                Some(CancelReason::ByteBudget)
            } else {
                token.reason()
            };
            if let Some(reason) = cancelled {
                status = RunStatus::Cancelled {
                    reason,
                    at_line: lines_scanned,
                };
                break;
            }

            let hits = scanner.scan_line(line.number, &line.text);
            aggregator.extend(extractor.push_line(&line.text, hits));
            lines_scanned = line.number;
            bytes_scanned = reader.bytes_read();
        }

        if reader.bytes_read() == 0 {
            return Err(FatalInputError::Empty.into());
        }

        aggregator.extend(extractor.finish());

        let warnings = reader.take_warnings();
        if let Some(first) = warnings.first() {
            warn!(
                filename,
                ranges = warnings.len(),
                first_line = first.line_number,
                "replaced invalid UTF-8 in input"
            );
        }
        match status {
            RunStatus::Complete => {}
            RunStatus::Cancelled { reason, at_line } => {
                warn!(filename, %reason, at_line, "analysis cancelled");
            }
            RunStatus::Truncated { at_line, bytes_read } => {
                warn!(
                    filename,
                    at_line,
                    bytes_read,
                    error = read_error.as_deref().unwrap_or(""),
                    "input read failed, keeping partial result"
                );
            }
        }

        let file_id = file_id.unwrap_or_else(|| {
            let mut digest = reader.content_digest();
            digest.truncate(FILE_ID_LEN);
            digest
        });
        let result = aggregator.finish(filename, Some(file_id), analysis_time);

        debug!(
            filename,
            lines = lines_scanned,
            bytes = bytes_scanned,
            issues = result.summary.total_issues,
            "analysis finished"
        );

        Ok(AnalysisReport {
            result,
            status,
            warnings,
            rule_errors: self.rule_errors.clone(),
            lines_scanned,
            bytes_scanned,
            read_error,
        })
    }
}

/// Compile `rules` and analyze `content` in one call.
pub fn analyze(content: &[u8], filename: &str, rules: &[Rule]) -> Result<AnalysisReport> {
    Analyzer::from_rules(rules).analyze_bytes(content, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtriage_core::Severity;

    fn numbered(lines: &[(usize, &str)], total: usize) -> String {
        (1..=total)
            .map(|n| {
                lines
                    .iter()
                    .find(|(line, _)| *line == n)
                    .map(|(_, text)| text.to_string())
                    .unwrap_or_else(|| format!("line {n} ok"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn literal(name: &str, operator: &str, patterns: &[&str]) -> Rule {
        let mut rule = Rule::new(1, name, patterns.iter().map(|p| p.to_string()).collect());
        rule.operator = operator.to_string();
        rule.is_regex = false;
        rule
    }

    #[test]
    fn test_literal_or_scenario() {
        let content = numbered(&[(10, "OOM killer invoked")], 12);
        let report = analyze(
            content.as_bytes(),
            "syslog",
            &[literal("OOM", "OR", &["Out of memory", "OOM"])],
        )
        .unwrap();

        assert!(report.is_complete());
        let issues = &report.result.issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule_name, "OOM");
        assert_eq!(issues[0].matched_text, "OOM");
        assert_eq!(issues[0].line_number, 10);
        assert_eq!(issues[0].severity, Severity::High);
        assert_eq!(
            issues[0].context,
            "line 8 ok\nline 9 ok\nOOM killer invoked\nline 11 ok\nline 12 ok"
        );
    }

    #[test]
    fn test_regex_scenario() {
        let content = numbered(&[(5, "2024-01-01 ERROR disk failure")], 6);
        let report = analyze(
            content.as_bytes(),
            "app.log",
            &[Rule::new(2, "Errors", vec![r"\bERROR\b".into()])],
        )
        .unwrap();
        let issue = &report.result.issues[0];
        assert_eq!(issue.matched_text, "ERROR");
        assert_eq!(issue.line_number, 5);
    }

    #[test]
    fn test_and_scenario() {
        let content = numbered(
            &[(3, "Connection refused"), (7, "Connection attempt timeout after 30s")],
            8,
        );
        let report = analyze(
            content.as_bytes(),
            "net.log",
            &[literal("Timeout", "AND", &["Connection", "timeout"])],
        )
        .unwrap();
        let lines: Vec<_> = report.result.issues.iter().map(|i| i.line_number).collect();
        assert_eq!(lines, vec![7]);
    }

    #[test]
    fn test_not_scenario() {
        let report = analyze(
            b"start\nrunning\nstop\n",
            "quiet.log",
            &[literal("No debug", "NOT", &["DEBUG"])],
        )
        .unwrap();
        assert_eq!(report.result.summary.total_issues, 3);
        assert!(report
            .result
            .issues
            .iter()
            .all(|i| i.matched_text == "No debug"));
    }

    #[test]
    fn test_disabled_rule_never_fires() {
        let mut rule = literal("OOM", "OR", &["OOM"]);
        rule.enabled = false;
        let report = analyze(b"OOM\nOOM\n", "a.log", &[rule]).unwrap();
        assert!(report.result.issues.is_empty());
        assert!(report.rule_errors.is_empty());
    }

    #[test]
    fn test_rule_errors_travel_with_the_report() {
        let rules = vec![
            Rule::new(1, "broken", vec!["(".into()]),
            Rule::new(2, "fine", vec!["ok".into()]),
        ];
        let report = analyze(b"ok\n", "a.log", &rules).unwrap();
        assert_eq!(report.rule_errors.len(), 1);
        assert_eq!(report.result.summary.total_issues, 1);
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let err = analyze(b"", "empty.log", &[]).unwrap_err();
        assert!(matches!(err, Error::FatalInput(FatalInputError::Empty)));
    }

    #[test]
    fn test_pre_cancelled_token_yields_flagged_partial_result() {
        let analyzer = Analyzer::from_rules(&[Rule::new(1, "a", vec!["a".into()])]);
        let token = CancellationToken::new();
        token.cancel();

        let report = analyzer
            .analyze_reader(&b"a\na\n"[..], "a.log", None, &token)
            .unwrap();
        assert_eq!(
            report.status,
            RunStatus::Cancelled {
                reason: CancelReason::Requested,
                at_line: 0
            }
        );
        assert!(report.result.issues.is_empty());
        assert!(matches!(
            report.into_complete(),
            Err(Error::Cancelled {
                reason: CancelReason::Requested,
                lines_scanned: 0
            })
        ));
    }

    /// Hands out one line per `read` call, then fails. Cancels `token`
    /// when line `cancel_at` (zero-based) is requested.
    struct ScriptedReader {
        lines: Vec<&'static [u8]>,
        next: usize,
        fail_with: Option<io::ErrorKind>,
        cancel_at: Option<(usize, CancellationToken)>,
    }

    impl ScriptedReader {
        fn new(lines: Vec<&'static [u8]>) -> Self {
            Self {
                lines,
                next: 0,
                fail_with: None,
                cancel_at: None,
            }
        }
    }

    impl io::Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some((at, token)) = &self.cancel_at {
                if self.next == *at {
                    token.cancel();
                }
            }
            match self.lines.get(self.next) {
                Some(line) => {
                    self.next += 1;
                    buf[..line.len()].copy_from_slice(line);
                    Ok(line.len())
                }
                None => match self.fail_with {
                    Some(kind) => Err(io::Error::new(kind, "connection dropped")),
                    None => Ok(0),
                },
            }
        }
    }

    #[test]
    fn test_read_error_after_content_keeps_partial_result() {
        let analyzer = Analyzer::from_rules(&[Rule::new(1, "oom", vec!["oom".into()])]);
        let mut source = ScriptedReader::new(vec![&b"oom\n"[..]; 3]);
        source.fail_with = Some(io::ErrorKind::ConnectionReset);

        let report = analyzer
            .analyze_reader(
                io::BufReader::new(source),
                "net.log",
                None,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(
            report.status,
            RunStatus::Truncated {
                at_line: 3,
                bytes_read: 12
            }
        );
        assert!(!report.is_complete());
        assert_eq!(report.result.summary.total_issues, 3);
        assert_eq!(report.read_error.as_deref(), Some("connection dropped"));
        assert!(matches!(
            report.into_complete(),
            Err(Error::FatalInput(FatalInputError::Read { bytes_read: 12, .. }))
        ));
    }

    #[test]
    fn test_read_error_before_any_content_is_fatal() {
        let analyzer = Analyzer::from_rules(&[]);
        let mut source = ScriptedReader::new(Vec::new());
        source.fail_with = Some(io::ErrorKind::ConnectionReset);

        let err = analyzer
            .analyze_reader(
                io::BufReader::new(source),
                "net.log",
                None,
                &CancellationToken::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            Error::FatalInput(FatalInputError::Read { bytes_read: 0, .. })
        ));
    }

    #[test]
    fn test_cancel_during_scan_stops_at_the_current_line() {
        let analyzer = Analyzer::from_rules(&[Rule::new(1, "hit", vec!["hit".into()])]);
        let token = CancellationToken::new();
        let mut source = ScriptedReader::new(vec![&b"hit\n"[..]; 6]);
        source.cancel_at = Some((2, token.clone()));

        let report = analyzer
            .analyze_reader(io::BufReader::new(source), "live.log", None, &token)
            .unwrap();
        assert_eq!(
            report.status,
            RunStatus::Cancelled {
                reason: CancelReason::Requested,
                at_line: 2
            }
        );
        assert_eq!(report.lines_scanned, 2);
        assert_eq!(report.result.summary.total_issues, 2);
        assert!(report.result.issues.iter().all(|i| i.line_number <= 2));
    }

    #[test]
    fn test_byte_budget_stops_the_scan() {
        let analyzer = Analyzer::from_rules(&[Rule::new(1, "hit", vec!["hit".into()])])
            .with_options(ScanOptions {
                max_input_bytes: Some(8),
                ..ScanOptions::default()
            });

        // Lines are 4 bytes each with their newline
        let report = analyzer.analyze_bytes(b"hit\nhit\nhit\nhit\n", "big.log").unwrap();
        assert_eq!(
            report.status,
            RunStatus::Cancelled {
                reason: CancelReason::ByteBudget,
                at_line: 2
            }
        );
        assert_eq!(report.result.summary.total_issues, 2);
        assert_eq!(report.bytes_scanned, 8);
        // The window is clamped to what was scanned
        assert_eq!(report.result.issues[1].context, "hit\nhit");
    }

    #[test]
    fn test_unlimited_budget() {
        let analyzer = Analyzer::from_rules(&[]).with_options(ScanOptions {
            max_input_bytes: None,
            ..ScanOptions::default()
        });
        let content = "x\n".repeat(10_000);
        let report = analyzer.analyze_bytes(content.as_bytes(), "big.log").unwrap();
        assert!(report.is_complete());
        assert_eq!(report.lines_scanned, 10_000);
    }

    #[test]
    fn test_file_id_is_derived_from_content() {
        let report = analyze(b"abc\n", "a.log", &[]).unwrap();
        assert_eq!(report.result.file_id, Some(file_id_for(b"abc\n")));
        assert_eq!(report.result.file_id.as_deref().map(str::len), Some(16));

        let analyzer = Analyzer::from_rules(&[]);
        let report = analyzer
            .analyze_reader(&b"abc\n"[..], "a.log", Some("upload-7".into()), &CancellationToken::new())
            .unwrap();
        assert_eq!(report.result.file_id.as_deref(), Some("upload-7"));
    }

    #[test]
    fn test_decode_warnings_are_reported() {
        let report = analyze(b"bad \xff byte\n", "bin.log", &[]).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].line_number, 1);
    }

    #[test]
    fn test_line_level_can_be_disabled() {
        let rules = [Rule::new(1, "disk", vec!["disk".into()])];
        let with_level = analyze(b"ERROR disk\n", "a.log", &rules).unwrap();
        assert!(with_level.result.issues[0].level.is_some());

        let without = Analyzer::from_rules(&rules)
            .with_options(ScanOptions {
                include_line_level: false,
                ..ScanOptions::default()
            })
            .analyze_bytes(b"ERROR disk\n", "a.log")
            .unwrap();
        assert!(without.result.issues[0].level.is_none());
    }
}
