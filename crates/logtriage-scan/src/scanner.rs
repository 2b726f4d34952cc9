//! Line scanner
//!
//! Applies every compiled rule to every line, independently. A line that
//! several rules match yields one hit per rule, in rule declaration order.

use crate::decode::LineReader;
use crate::level::detect_level;
use logtriage_core::{DecodeWarning, FatalInputError, LogLevel};
use logtriage_rule_engine::CompiledRuleSet;
use std::io::BufRead;

/// One rule firing on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHit {
    /// Position of the rule in the snapshot.
    pub rule_index: usize,
    pub line_number: usize,
    pub matched_text: String,
    pub level: Option<LogLevel>,
}

/// Evaluates a snapshot against single lines.
#[derive(Debug, Clone, Copy)]
pub struct LineScanner<'s> {
    snapshot: &'s CompiledRuleSet,
    detect_level: bool,
}

impl<'s> LineScanner<'s> {
    pub fn new(snapshot: &'s CompiledRuleSet) -> Self {
        Self {
            snapshot,
            detect_level: false,
        }
    }

    /// Attach a heuristic log level to every hit.
    pub fn with_level_detection(mut self, enabled: bool) -> Self {
        self.detect_level = enabled;
        self
    }

    /// All hits on one line, in rule order.
    pub fn scan_line(&self, line_number: usize, line: &str) -> Vec<RawHit> {
        let mut hits: Vec<RawHit> = self
            .snapshot
            .rules()
            .iter()
            .enumerate()
            .filter_map(|(rule_index, rule)| {
                rule.evaluate(line).map(|text| RawHit {
                    rule_index,
                    line_number,
                    matched_text: text.to_string(),
                    level: None,
                })
            })
            .collect();

        if self.detect_level && !hits.is_empty() {
            let level = detect_level(line);
            for hit in &mut hits {
                hit.level = level;
            }
        }

        hits
    }
}

/// Hits of a complete scan without context.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub hits: Vec<RawHit>,
    pub warnings: Vec<DecodeWarning>,
    pub lines: usize,
}

/// Scan a whole stream, returning ordered hits.
///
/// A stream that ends before any byte arrives is a [`FatalInputError::Empty`].
pub fn scan<R: BufRead>(
    reader: R,
    snapshot: &CompiledRuleSet,
) -> Result<ScanOutput, FatalInputError> {
    let scanner = LineScanner::new(snapshot);
    let mut lines = LineReader::new(reader);
    let mut hits = Vec::new();

    while let Some(line) = lines.next_line().map_err(|source| FatalInputError::Read {
        bytes_read: lines.bytes_read(),
        source,
    })? {
        hits.extend(scanner.scan_line(line.number, &line.text));
    }

    if lines.bytes_read() == 0 {
        return Err(FatalInputError::Empty);
    }

    Ok(ScanOutput {
        hits,
        lines: lines.line_number(),
        warnings: lines.take_warnings(),
    })
}
