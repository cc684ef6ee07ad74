//! Formula parsing and evaluation
//!
//! Supports the small arithmetic language used by catalog flexible values,
//! e.g. `"intelligence * 3 + level"` or `"(level + 1) / 2"`.
//!
//! Grammar (whitespace-insensitive):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := '-' unary | primary
//! primary := integer | symbol | '(' expr ')'
//! ```
//!
//! Symbols come from a fixed table: `level` and the attribute names or their
//! abbreviations. Division rounds down. Anything else is an error; nothing is
//! ever coerced to zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use super::Attribute;

/// Parentheses deeper than this are rejected to keep evaluation bounded.
const MAX_NESTING_DEPTH: usize = 32;

/// Error when parsing or evaluating a formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// The formula string is empty
    #[error("Empty formula")]
    Empty,
    /// A character outside the grammar
    #[error("Unexpected character '{ch}' at position {position} in '{formula}'")]
    UnexpectedCharacter {
        formula: String,
        ch: char,
        position: usize,
    },
    /// A token in the wrong place (e.g. "2 +* 3")
    #[error("Unexpected {found} in '{formula}'")]
    UnexpectedToken { formula: String, found: String },
    /// The formula ended before an operand or ')'
    #[error("Unexpected end of formula '{0}'")]
    UnexpectedEnd(String),
    /// The formula references a symbol outside the symbol table
    #[error("Unknown symbol '{symbol}' in '{formula}'")]
    UnknownSymbol { formula: String, symbol: String },
    /// Division by zero
    #[error("Division by zero in '{0}'")]
    DivisionByZero(String),
    /// Integer overflow
    #[error("Arithmetic overflow in '{0}'")]
    Overflow(String),
    /// Too many nested parentheses
    #[error("Formula nested too deeply: '{0}'")]
    NestingTooDeep(String),
}

/// Named inputs a formula may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaContext {
    pub level: u8,
    pub attributes: BTreeMap<Attribute, i32>,
}

impl FormulaContext {
    pub fn new(level: u8, attributes: BTreeMap<Attribute, i32>) -> Self {
        Self { level, attributes }
    }

    pub fn with_attribute(mut self, attribute: Attribute, value: i32) -> Self {
        self.attributes.insert(attribute, value);
        self
    }

    /// Resolve a symbol against the fixed symbol table.
    ///
    /// Attributes missing from the map count as a score of 0; the symbol is
    /// still known. Unknown symbols return `None`.
    pub fn resolve(&self, symbol: &str) -> Option<i64> {
        let lowered = symbol.to_ascii_lowercase();
        if lowered == "level" || lowered == "lvl" {
            return Some(i64::from(self.level));
        }
        let attribute: Attribute = lowered.parse().ok()?;
        Some(i64::from(
            self.attributes.get(&attribute).copied().unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Number(i64),
    Symbol(String),
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Symbol(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {}", n),
            Token::Symbol(s) => write!(f, "symbol '{}'", s),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
        }
    }
}

/// A parsed formula, ready to evaluate against a [`FormulaContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parse a formula string like "intelligence * 3 + level".
    pub fn parse(input: &str) -> Result<Self, EvaluationError> {
        let source = input.trim().to_string();
        if source.is_empty() {
            return Err(EvaluationError::Empty);
        }

        let tokens = tokenize(&source)?;
        let mut parser = Parser {
            source: &source,
            tokens: &tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(EvaluationError::UnexpectedToken {
                formula: source.clone(),
                found: token.to_string(),
            });
        }

        Ok(Self { source, expr })
    }

    /// Evaluate against the given context.
    pub fn evaluate(&self, ctx: &FormulaContext) -> Result<i32, EvaluationError> {
        let value = eval(&self.expr, ctx, &self.source)?;
        i32::try_from(value).map_err(|_| EvaluationError::Overflow(self.source.clone()))
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, EvaluationError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let digits: String = chars[start..i].iter().collect();
                let value: i64 = digits
                    .parse()
                    .map_err(|_| EvaluationError::Overflow(source.to_string()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Symbol(chars[start..i].iter().collect()));
            }
            other => {
                return Err(EvaluationError::UnexpectedCharacter {
                    formula: source.to_string(),
                    ch: other,
                    position: i,
                })
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    source: &'a str,
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr, EvaluationError> {
        let mut lhs = self.term()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, EvaluationError> {
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek() {
            let op = match token {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        if let Some(Token::Minus) = self.peek() {
            self.pos += 1;
            self.enter()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Symbol(name)) => Ok(Expr::Symbol(name.clone())),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(EvaluationError::UnexpectedToken {
                        formula: self.source.to_string(),
                        found: other.to_string(),
                    }),
                    None => Err(EvaluationError::UnexpectedEnd(self.source.to_string())),
                }
            }
            Some(other) => Err(EvaluationError::UnexpectedToken {
                formula: self.source.to_string(),
                found: other.to_string(),
            }),
            None => Err(EvaluationError::UnexpectedEnd(self.source.to_string())),
        }
    }

    fn enter(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(EvaluationError::NestingTooDeep(self.source.to_string()));
        }
        Ok(())
    }
}

fn eval(expr: &Expr, ctx: &FormulaContext, source: &str) -> Result<i64, EvaluationError> {
    let overflow = || EvaluationError::Overflow(source.to_string());
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Symbol(name) => ctx
            .resolve(name)
            .ok_or_else(|| EvaluationError::UnknownSymbol {
                formula: source.to_string(),
                symbol: name.clone(),
            }),
        Expr::Negate(inner) => eval(inner, ctx, source)?.checked_neg().ok_or_else(overflow),
        Expr::Binary(op, lhs, rhs) => {
            let a = eval(lhs, ctx, source)?;
            let b = eval(rhs, ctx, source)?;
            match op {
                BinaryOp::Add => a.checked_add(b).ok_or_else(overflow),
                BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow),
                BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(EvaluationError::DivisionByZero(source.to_string()));
                    }
                    floor_div(a, b).ok_or_else(overflow)
                }
            }
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FormulaContext {
        FormulaContext::default()
            .with_attribute(Attribute::Strength, 2)
            .with_attribute(Attribute::Intelligence, 3)
            .with_attribute(Attribute::Will, -1)
    }

    fn eval_str(input: &str) -> Result<i32, EvaluationError> {
        let mut context = ctx();
        context.level = 5;
        Formula::parse(input)?.evaluate(&context)
    }

    #[test]
    fn test_integer_literal() {
        assert_eq!(eval_str("7"), Ok(7));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Ok(14));
        assert_eq!(eval_str("(2 + 3) * 4"), Ok(20));
        assert_eq!(eval_str("10 - 4 - 3"), Ok(3));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(eval_str("intelligence * 3 + level"), Ok(14));
        assert_eq!(eval_str("INT + STR"), Ok(5));
        assert_eq!(eval_str("WIL"), Ok(-1));
        assert_eq!(eval_str("dexterity"), Ok(0));
    }

    #[test]
    fn test_division_rounds_down() {
        assert_eq!(eval_str("level / 2"), Ok(2));
        assert_eq!(eval_str("-5 / 2"), Ok(-3));
        assert_eq!(eval_str("will / 2"), Ok(-1));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_str("-level"), Ok(-5));
        assert_eq!(eval_str("--2"), Ok(2));
        assert_eq!(eval_str("3 * -2"), Ok(-6));
    }

    #[test]
    fn test_unknown_symbol_fails_closed() {
        let err = eval_str("charisma + 1").unwrap_err();
        assert_eq!(
            err,
            EvaluationError::UnknownSymbol {
                formula: "charisma + 1".into(),
                symbol: "charisma".into()
            }
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            eval_str("level / (2 - 2)"),
            Err(EvaluationError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_rejects_syntax_outside_grammar() {
        assert_eq!(Formula::parse("   "), Err(EvaluationError::Empty));
        assert!(matches!(
            Formula::parse("level ^ 2"),
            Err(EvaluationError::UnexpectedCharacter { ch: '^', .. })
        ));
        assert!(matches!(
            Formula::parse("2 +* 3"),
            Err(EvaluationError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Formula::parse("(level + 1"),
            Err(EvaluationError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            Formula::parse("level level"),
            Err(EvaluationError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            Formula::parse("max(level)"),
            Err(EvaluationError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert!(matches!(
            Formula::parse(&deep),
            Err(EvaluationError::NestingTooDeep(_))
        ));
    }

    #[test]
    fn test_overflow() {
        assert!(matches!(
            eval_str("2147483647 + 1"),
            Err(EvaluationError::Overflow(_))
        ));
    }

    #[test]
    fn test_display_keeps_source() {
        let formula = Formula::parse("INT * 2 + (level - STR)").unwrap();
        assert_eq!(formula.to_string(), "INT * 2 + (level - STR)");
    }
}
