//! Log level heuristics for matched lines.

use logtriage_core::LogLevel;

/// Checked in order; the first group with a word occurring in the line wins.
const LEVEL_WORDS: &[(LogLevel, &[&str])] = &[
    (LogLevel::Error, &["error", "err", "fatal"]),
    (LogLevel::Warning, &["warn", "warning"]),
    (LogLevel::Info, &["info", "information"]),
    (LogLevel::Debug, &["debug", "dbg"]),
    (LogLevel::Critical, &["critical", "crit", "panic"]),
];

/// Guess the level of a log line by case-insensitive substring search.
pub fn detect_level(line: &str) -> Option<LogLevel> {
    let lower = line.to_lowercase();
    LEVEL_WORDS
        .iter()
        .find(|(_, words)| words.iter().any(|word| lower.contains(word)))
        .map(|(level, _)| *level)
}
