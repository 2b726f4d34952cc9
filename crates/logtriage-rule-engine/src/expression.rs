//! Keyword expressions
//!
//! A small boolean language over case-insensitive keywords:
//!
//! ```text
//! expr    := or
//! or      := and ( '|' and )*
//! and     := not ( '&' not )*
//! not     := ( '!' | '！' ) not | primary
//! primary := KEYWORD | '(' or ')'
//! ```
//!
//! Keywords are quoted (`"kernel panic"`, `'oom'`, backslash escapes the
//! next character) or bare words of alphanumerics and `_-.`. A keyword
//! holds when it occurs anywhere in the line, ignoring case.

use crate::constants::MAX_EXPRESSION_DEPTH;
use crate::matcher::{check_length, compile_literal};
use crate::{Result, RuleError};
use regex::{Match, Regex};
use std::cmp::Reverse;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Keyword(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eof,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' | '\'' => {
                chars.next();
                let mut value = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    if ch == c {
                        closed = true;
                        break;
                    }
                    if ch == '\\' {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    } else {
                        value.push(ch);
                    }
                }
                if !closed {
                    return Err(RuleError::InvalidPattern(format!(
                        "Unterminated string starting at position {}",
                        pos
                    )));
                }
                tokens.push(Token::Keyword(value));
            }
            '&' => {
                chars.next();
                tokens.push(Token::And);
            }
            '|' => {
                chars.next();
                tokens.push(Token::Or);
            }
            '!' | '！' => {
                chars.next();
                tokens.push(Token::Not);
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if is_word_char(c) => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Keyword(word));
            }
            other => {
                return Err(RuleError::InvalidPattern(format!(
                    "Unexpected character '{}' at position {}",
                    other, pos
                )));
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

#[derive(Debug, Clone)]
enum Expr {
    Keyword(usize),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    keywords: Vec<Regex>,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize() always ends with Eof and the parser never advances past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn error(&self, message: &str) -> RuleError {
        let at = match self.current() {
            Token::Keyword(word) => format!("'{}'", word),
            Token::Eof => "end of expression".to_string(),
            other => format!("{:?}", other),
        };
        RuleError::InvalidPattern(format!("Parser error at {}: {}", at, message))
    }

    fn parse(&mut self) -> Result<Expr> {
        let expr = self.or_expr(0)?;
        if *self.current() != Token::Eof {
            return Err(self.error("unexpected token after complete expression"));
        }
        Ok(expr)
    }

    fn or_expr(&mut self, depth: usize) -> Result<Expr> {
        let mut node = self.and_expr(depth)?;
        while *self.current() == Token::Or {
            self.advance();
            let right = self.and_expr(depth)?;
            node = Expr::Or(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn and_expr(&mut self, depth: usize) -> Result<Expr> {
        let mut node = self.not_expr(depth)?;
        while *self.current() == Token::And {
            self.advance();
            let right = self.not_expr(depth)?;
            node = Expr::And(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn not_expr(&mut self, depth: usize) -> Result<Expr> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        if *self.current() == Token::Not {
            self.advance();
            let operand = self.not_expr(depth + 1)?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.primary(depth)
    }

    fn primary(&mut self, depth: usize) -> Result<Expr> {
        match self.current().clone() {
            Token::Keyword(word) => {
                if word.is_empty() {
                    return Err(self.error("empty keyword"));
                }
                let regex = compile_literal(&word)?;
                self.advance();
                self.keywords.push(regex);
                Ok(Expr::Keyword(self.keywords.len() - 1))
            }
            Token::LParen => {
                self.advance();
                let node = self.or_expr(depth + 1)?;
                if *self.current() != Token::RParen {
                    return Err(self.error("expected ')'"));
                }
                self.advance();
                Ok(node)
            }
            _ => Err(self.error("expected a keyword or '('")),
        }
    }
}

/// A compiled keyword expression.
#[derive(Debug, Clone)]
pub struct KeywordExpression {
    source: String,
    root: Expr,
    keywords: Vec<Regex>,
}

impl KeywordExpression {
    /// Parse and compile an expression.
    pub fn parse(source: &str) -> Result<Self> {
        check_length(source)?;

        let mut parser = Parser {
            tokens: tokenize(source)?,
            position: 0,
            keywords: Vec::new(),
        };
        let root = parser.parse()?;

        Ok(Self {
            source: source.to_string(),
            root,
            keywords: parser.keywords,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the expression against one line.
    pub fn evaluate(&self, line: &str) -> bool {
        self.eval_node(&self.root, line)
    }

    fn eval_node(&self, node: &Expr, line: &str) -> bool {
        match node {
            Expr::Keyword(index) => self.keywords[*index].is_match(line),
            Expr::And(left, right) => self.eval_node(left, line) && self.eval_node(right, line),
            Expr::Or(left, right) => self.eval_node(left, line) || self.eval_node(right, line),
            Expr::Not(operand) => !self.eval_node(operand, line),
        }
    }

    /// Evaluate and return the text that made the expression hold.
    ///
    /// That is the leftmost keyword matched in a subtree that holds, or the
    /// expression source when it holds only through negation.
    pub fn find<'a>(&'a self, line: &'a str) -> Option<&'a str> {
        self.held(&self.root, line, false)
            .map(|found| found.map_or(self.source.as_str(), |m| m.as_str()))
    }

    /// `None` when `node` (inverted if `negated`) does not hold on `line`,
    /// otherwise the keyword match that makes it hold, if any.
    fn held<'l>(
        &self,
        node: &Expr,
        line: &'l str,
        negated: bool,
    ) -> Option<Option<Match<'l>>> {
        match node {
            Expr::Keyword(index) => {
                let found = self.keywords[*index].find(line);
                match (found, negated) {
                    (Some(m), false) => Some(Some(m)),
                    (None, true) => Some(None),
                    _ => None,
                }
            }
            Expr::Not(operand) => self.held(operand, line, !negated),
            Expr::And(left, right) | Expr::Or(left, right) => {
                let left = self.held(left, line, negated);
                let right = self.held(right, line, negated);
                // Under negation & and | swap roles
                if matches!(node, Expr::And(..)) != negated {
                    Some(leftmost(left?, right?))
                } else {
                    match (left, right) {
                        (Some(l), Some(r)) => Some(leftmost(l, r)),
                        (held, None) | (None, held) => held,
                    }
                }
            }
        }
    }
}

fn leftmost<'l>(a: Option<Match<'l>>, b: Option<Match<'l>>) -> Option<Match<'l>> {
    match (a, b) {
        (Some(a), Some(b)) => {
            Some(std::cmp::min_by_key(a, b, |m| (m.start(), Reverse(m.end()))))
        }
        (a, b) => a.or(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str, line: &str) -> bool {
        KeywordExpression::parse(expr).unwrap().evaluate(line)
    }

    #[test]
    fn test_basic_operators() {
        assert!(eval(r#""error" & "fatal""#, "fatal error occurred"));
        assert!(eval(r#""warn" | "error""#, "warning message"));
        assert!(eval(r#""error" & !"warning""#, "error occurred"));
        assert!(!eval(r#""error" & !"warning""#, "warning: error occurred"));
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        // a | b & c  ==  a | (b & c)
        assert!(eval("a1 | b2 & c3", "a1"));
        assert!(!eval("a1 | b2 & c3", "b2"));
        assert!(eval("(a1 | b2) & c3", "b2 c3"));
        assert!(!eval("(a1 | b2) & c3", "a1"));
    }

    #[test]
    fn test_not_variants_and_double_negation() {
        assert!(eval("！debug", "info line"));
        assert!(eval("!!panic", "Kernel panic"));
        assert!(!eval("!!panic", "all good"));
    }

    #[test]
    fn test_quoted_keywords_with_escapes() {
        assert!(eval(r#""say \"hi\"""#, r#"they say "HI" loudly"#));
        assert!(eval("'kernel panic'", "Kernel Panic - not syncing"));
        assert!(eval(r#""aq_ring_rx_clean" & atlantic"#, "atlantic: aq_ring_rx_clean+0x1f"));
    }

    #[test]
    fn test_case_insensitive_keywords() {
        assert!(eval("OOM", "oom-killer invoked"));
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "\"unterminated", "a &", "(a | b", "a b", "a $ b", "\"\"", ")"] {
            assert!(KeywordExpression::parse(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}a{}", "(".repeat(MAX_EXPRESSION_DEPTH + 2), ")".repeat(MAX_EXPRESSION_DEPTH + 2));
        assert!(KeywordExpression::parse(&deep).is_err());
        let shallow = "((((a))))";
        assert!(KeywordExpression::parse(shallow).is_ok());
    }

    #[test]
    fn test_find_skips_negated_keywords() {
        let expr = KeywordExpression::parse(r#"!"disk" | "timeout" | "connection""#).unwrap();
        assert_eq!(expr.find("connection timeout on disk"), Some("connection"));
        assert_eq!(expr.find("disk only"), None);
    }

    #[test]
    fn test_find_reports_keyword_from_the_branch_that_held() {
        let expr = KeywordExpression::parse(r#"("x1" & "y1") | "z1""#).unwrap();
        assert_eq!(expr.find("x1 z1"), Some("z1"));
        assert_eq!(expr.find("y1 x1 z1"), Some("y1"));
        assert_eq!(expr.find("x1 only"), None);
    }

    #[test]
    fn test_find_through_negation() {
        // !(a & !b) == !a | b
        let expr = KeywordExpression::parse("!(a1 & !b2)").unwrap();
        assert_eq!(expr.find("a1 b2"), Some("b2"));
        assert_eq!(expr.find("nothing"), Some("!(a1 & !b2)"));
        assert_eq!(expr.find("a1 alone"), None);

        let double = KeywordExpression::parse("!!panic").unwrap();
        assert_eq!(double.find("Kernel PANIC"), Some("PANIC"));
    }

    #[test]
    fn test_find_agrees_with_evaluate() {
        let exprs = ["a1 | b2 & c3", "!(a1 | b2) | c3", "(a1 & !b2) | (!a1 & b2)", "!!a1 & !c3"];
        let lines = ["", "a1", "b2", "c3", "a1 b2", "a1 c3", "b2 c3", "a1 b2 c3"];
        for source in exprs {
            let expr = KeywordExpression::parse(source).unwrap();
            for line in lines {
                assert_eq!(
                    expr.find(line).is_some(),
                    expr.evaluate(line),
                    "{:?} on {:?}",
                    source,
                    line
                );
            }
        }
    }
}
