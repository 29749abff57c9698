//! Constraint logic expressions such as `A and (B or C)`.
//!
//! `and` binds tighter than `or`; keywords are case-insensitive, codes are
//! upper-case letters. `AND` and `OR` are therefore never codes.

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Deepest parenthesis nesting accepted
pub const MAX_DEPTH: usize = 64;

/// Whether `code` spells a keyword and so cannot name a constraint
pub fn is_reserved_code(code: &str) -> bool {
    code.eq_ignore_ascii_case("and") || code.eq_ignore_ascii_case("or")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LogicError {
    #[error("Invalid character '{found}' in constraint logic at position {position}")]
    InvalidCharacter { found: char, position: usize },

    #[error("Unexpected '{0}' in constraint logic")]
    UnexpectedToken(String),

    #[error("Constraint logic ends unexpectedly")]
    UnexpectedEnd,

    #[error("Constraint logic is empty")]
    Empty,

    #[error("Constraint logic nests parentheses deeper than {0}")]
    TooDeep(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicExpr {
    Code(String),
    And(Vec<LogicExpr>),
    Or(Vec<LogicExpr>),
}

impl LogicExpr {
    pub fn parse(input: &str) -> Result<Self, LogicError> {
        let tokens = tokenize(input)?;
        if tokens.is_empty() {
            return Err(LogicError::Empty);
        }
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.or_expr()?;
        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(t) => Err(LogicError::UnexpectedToken(t.to_string())),
        }
    }

    /// Every code mentioned in the expression
    pub fn codes(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_codes(&mut out);
        out
    }

    fn collect_codes(&self, out: &mut BTreeSet<String>) {
        match self {
            LogicExpr::Code(c) => {
                out.insert(c.clone());
            }
            LogicExpr::And(parts) | LogicExpr::Or(parts) => {
                for p in parts {
                    p.collect_codes(out);
                }
            }
        }
    }
}

impl fmt::Display for LogicExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicExpr::Code(c) => f.write_str(c),
            LogicExpr::And(parts) => write_joined(f, parts, "and"),
            LogicExpr::Or(parts) => write_joined(f, parts, "or"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[LogicExpr], sep: &str) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", sep)?;
        }
        match part {
            LogicExpr::Code(_) => write!(f, "{}", part)?,
            _ => write!(f, "({})", part)?,
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Code(String),
    And,
    Or,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Code(c) => f.write_str(c),
            Token::And => f.write_str("and"),
            Token::Or => f.write_str("or"),
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, LogicError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((position, c)) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            c if c.is_whitespace() => {}
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some((_, next)) = chars.peek() {
                    if !next.is_ascii_alphabetic() {
                        break;
                    }
                    word.push(*next);
                    chars.next();
                }
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ if word.chars().all(|c| c.is_ascii_uppercase()) => Token::Code(word),
                    _ => return Err(LogicError::UnexpectedToken(word)),
                };
                tokens.push(token);
            }
            found => return Err(LogicError::InvalidCharacter { found, position }),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn or_expr(&mut self) -> Result<LogicExpr, LogicError> {
        let mut parts = vec![self.and_expr()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            parts.push(self.and_expr()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            LogicExpr::Or(parts)
        })
    }

    fn and_expr(&mut self) -> Result<LogicExpr, LogicError> {
        let mut parts = vec![self.atom()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            parts.push(self.atom()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            LogicExpr::And(parts)
        })
    }

    fn atom(&mut self) -> Result<LogicExpr, LogicError> {
        let token = self.peek().cloned().ok_or(LogicError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Code(c) => Ok(LogicExpr::Code(c)),
            Token::Open => {
                if self.depth >= MAX_DEPTH {
                    return Err(LogicError::TooDeep(MAX_DEPTH));
                }
                self.depth += 1;
                let inner = self.or_expr()?;
                self.depth -= 1;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(inner)
                    }
                    Some(other) => Err(LogicError::UnexpectedToken(other.to_string())),
                    None => Err(LogicError::UnexpectedEnd),
                }
            }
            other => Err(LogicError::UnexpectedToken(other.to_string())),
        }
    }
}
