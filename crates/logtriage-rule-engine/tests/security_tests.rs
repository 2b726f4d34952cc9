//! Security tests for the logtriage-rule-engine
//!
//! These tests verify protection against:
//! - ReDoS (Regular Expression Denial of Service)
//! - Memory exhaustion via large rule files
//! - Symlinks escaping a rule directory
//! - Pathological keyword expressions

use logtriage_core::{Rule, RuleType};
use logtriage_rule_engine::{
    CompiledRule, CompiledRuleSet, PatternMatcher, RuleError, RuleLoader, MAX_EXPRESSION_DEPTH,
    MAX_PATTERN_LENGTH, MAX_RULE_FILE_SIZE,
};
use std::fs;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn regex_rule(pattern: &str) -> Rule {
    Rule::new(1, "redos", vec![pattern.to_string()])
}

fn assert_compiles_quickly(pattern: &str) -> Option<CompiledRule> {
    let start = Instant::now();
    let result = CompiledRule::compile(&regex_rule(pattern));
    let compile_duration = start.elapsed();

    assert!(
        compile_duration < Duration::from_millis(500),
        "Compilation took too long: {:?}",
        compile_duration
    );
    result.ok()
}

fn assert_bounded(pattern: &str, input: &str) {
    if let Some(rule) = assert_compiles_quickly(pattern) {
        let match_start = Instant::now();
        let _ = rule.evaluate(input);
        let match_duration = match_start.elapsed();

        assert!(
            match_duration < Duration::from_millis(100),
            "Matching took too long: {:?}",
            match_duration
        );
    }
}

// ============================================================================
// ReDoS Pattern Testing
// ============================================================================

#[test]
fn test_redos_catastrophic_backtracking_nested_quantifiers() {
    // (a+)+b against a long run of 'a' with no 'b'
    assert_bounded("(a+)+b", &"a".repeat(64));
}

#[test]
fn test_redos_nested_star_quantifiers() {
    assert_bounded("(x*)*y", &"x".repeat(64));
}

#[test]
fn test_redos_alternation_with_overlap() {
    assert_bounded("(a|a)*b", &"a".repeat(64));
}

#[test]
fn test_redos_dfa_size_limit_enforcement() {
    // Would build a large automaton without limits; only compilation is
    // bounded since a debug build matches a counted repetition slowly
    if let Some(rule) = assert_compiles_quickly("a{1000,2000}") {
        assert!(rule.evaluate(&"a".repeat(1500)).is_some());
        assert!(rule.evaluate(&"a".repeat(999)).is_none());
    }
}

#[test]
fn test_long_line_is_scanned_in_linear_time() {
    let rule = CompiledRule::compile(&regex_rule(r"(\w+\s?)+$")).unwrap();
    let line = format!("{}!", "word ".repeat(2_000));

    let start = Instant::now();
    let _ = rule.evaluate(&line);
    assert!(start.elapsed() < Duration::from_secs(2));
}

// ============================================================================
// Pattern Limits
// ============================================================================

#[test]
fn test_pattern_at_limit_accepted() {
    let pattern = "a".repeat(MAX_PATTERN_LENGTH);
    let rule = CompiledRule::compile(&regex_rule(&pattern)).unwrap();
    assert!(rule.evaluate(&pattern).is_some());
}

#[test]
fn test_pattern_over_limit_rejected() {
    let pattern = "a".repeat(MAX_PATTERN_LENGTH + 1);
    let err = CompiledRule::compile(&regex_rule(&pattern)).unwrap_err();
    assert!(err.reason.contains("exceeds maximum length"));
    assert!(err.reason.contains(&MAX_PATTERN_LENGTH.to_string()));
}

#[test]
fn test_invalid_regex_syntax_rejected() {
    let invalid_patterns = vec![
        "[",       // Unclosed bracket
        "(",       // Unclosed parenthesis
        "\\",      // Incomplete escape
        "*",       // Quantifier without operand
        "+",       // Quantifier without operand
        "a{10,20", // Unclosed quantifier
        "[z-a]",   // Inverted class range
    ];

    for pattern in invalid_patterns {
        assert!(
            PatternMatcher::compile(pattern, RuleType::Regex).is_err(),
            "Pattern '{}' should have been rejected",
            pattern
        );
        // Every one of them is fine as literal text
        assert!(PatternMatcher::compile(pattern, RuleType::Keyword).is_ok());
    }
}

#[test]
fn test_malformed_patterns_only_drop_their_rule() {
    let rules = vec![
        Rule::new(1, "rule1", vec!["[".into()]),
        Rule::new(2, "rule2", vec!["(".into()]),
        Rule::new(3, "rule3", vec!["^valid".into()]),
    ];

    let compilation = CompiledRuleSet::compile(&rules);
    assert_eq!(compilation.snapshot.len(), 1);
    assert_eq!(compilation.errors.len(), 2);
    assert_eq!(compilation.snapshot.rules()[0].name, "rule3");
}

// ============================================================================
// Keyword Expressions
// ============================================================================

#[test]
fn test_deeply_nested_expression_rejected() {
    let depth = MAX_EXPRESSION_DEPTH * 4;
    let expression = format!("{}panic{}", "(".repeat(depth), ")".repeat(depth));
    assert!(PatternMatcher::compile(&expression, RuleType::Dsl).is_err());

    let negations = format!("{}panic", "!".repeat(depth));
    assert!(PatternMatcher::compile(&negations, RuleType::Dsl).is_err());
}

#[test]
fn test_expression_keywords_are_literal() {
    let matcher = PatternMatcher::compile(r#""(a+)+b" | ".*""#, RuleType::Dsl).unwrap();
    assert!(!matcher.is_match("aaaaaaaaab"));
    assert!(matcher.is_match("literal .* here"));
}

// ============================================================================
// Rule File Handling
// ============================================================================

#[tokio::test]
async fn test_loader_rejects_oversized_files() {
    let temp_dir = TempDir::new().unwrap();
    let rule_file = temp_dir.path().join("large.toml");
    fs::write(&rule_file, vec![b'#'; (MAX_RULE_FILE_SIZE as usize) + 1]).unwrap();

    let result = RuleLoader::new()
        .with_builtin(false)
        .with_path(temp_dir.path())
        .load_all()
        .await;

    match result {
        Err(RuleError::FileTooLarge { size, limit, .. }) => {
            assert_eq!(limit, MAX_RULE_FILE_SIZE);
            assert!(size > limit);
        }
        other => panic!("expected FileTooLarge, got {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn test_file_at_size_limit_accepted() {
    let temp_dir = TempDir::new().unwrap();
    let rule_file = temp_dir.path().join("at_limit.toml");

    let mut content = String::from("[[rules]]\nname = \"padded\"\npatterns = [\"x\"]\n");
    content.push('#');
    content.push_str(&"a".repeat(MAX_RULE_FILE_SIZE as usize - content.len()));
    assert_eq!(content.len() as u64, MAX_RULE_FILE_SIZE);
    fs::write(&rule_file, content).unwrap();

    let rules = RuleLoader::new()
        .with_builtin(false)
        .with_path(&rule_file)
        .load_all()
        .await
        .unwrap();
    assert_eq!(rules.len(), 1);
}

#[tokio::test]
#[cfg(unix)]
async fn test_symlink_not_followed() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let rules_dir = temp_dir.path().join("rules");
    fs::create_dir_all(&rules_dir).unwrap();

    // A symlink pointing outside the rules directory
    let outside_file = temp_dir.path().join("outside.toml");
    fs::write(
        &outside_file,
        "[[rules]]\nname = \"outside\"\npatterns = [\"x\"]\n",
    )
    .unwrap();
    symlink(&outside_file, rules_dir.join("link.toml")).unwrap();

    let rules = RuleLoader::new()
        .with_builtin(false)
        .with_path(&rules_dir)
        .load_all()
        .await
        .unwrap();
    assert!(!rules.iter().any(|r| r.name == "outside"));
}

#[tokio::test]
async fn test_unknown_fields_in_rule_files_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let rule_file = temp_dir.path().join("extra.json");
    fs::write(
        &rule_file,
        r#"[{"id": 8, "name": "extra", "patterns": ["x"], "created_at": "2024-01-01", "owner": 3}]"#,
    )
    .unwrap();

    let rules = RuleLoader::new()
        .with_builtin(false)
        .with_path(&rule_file)
        .load_all()
        .await
        .unwrap();
    assert_eq!(rules[0].name, "extra");
}
