//! Recursive descent parser from constraint tokens to a [`Predicate`] tree.
//!
//! GRAMMAR:
//!   predicate   --> disjunction
//!   disjunction --> conjunction ( "or" conjunction )*
//!   conjunction --> negation ( "and" negation )*
//!   negation    --> "not" negation | primary
//!   primary     --> "(" predicate ")" | comparison
//!   comparison  --> operand OPERATOR operand     // exactly one side is a column
//!   operand     --> IDENT | NUMBER | STRING

use std::fmt;

use super::lexer::{Lexer, Token};

/// Deepest allowed nesting of `not` and parentheses
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl CompareOp {
    fn from_token(token: &Token) -> Option<Self> {
        Some(match token {
            Token::Equal => Self::Equal,
            Token::NotEqual => Self::NotEqual,
            Token::Less => Self::Less,
            Token::LessEqual => Self::LessEqual,
            Token::Greater => Self::Greater,
            Token::GreaterEqual => Self::GreaterEqual,
            _ => return None,
        })
    }

    /// Operator with its operands swapped (`5 < x` is `x > 5`)
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Less => Self::Greater,
            Self::LessEqual => Self::GreaterEqual,
            Self::Greater => Self::Less,
            Self::GreaterEqual => Self::LessEqual,
            other => other,
        }
    }

    /// Compare two ordered values; an unordered pair (NaN) is always false
    pub fn test<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        let Some(ordering) = left.partial_cmp(right) else {
            return false;
        };
        match self {
            Self::Equal => ordering.is_eq(),
            Self::NotEqual => ordering.is_ne(),
            Self::Less => ordering.is_lt(),
            Self::LessEqual => ordering.is_le(),
            Self::Greater => ordering.is_gt(),
            Self::GreaterEqual => ordering.is_ge(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

enum Operand {
    Column(String),
    Value(Literal),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            depth: 0,
        }
    }

    /// Parse the whole input; `None` for an empty constraint
    pub fn parse(&mut self) -> ParseResult<Option<Predicate>> {
        if self.current_token == Token::Eof {
            return Ok(None);
        }
        let predicate = self.parse_disjunction()?;
        if self.current_token != Token::Eof {
            return Err(ParseError::new(format!(
                "unexpected {:?} after predicate",
                self.current_token
            )));
        }
        Ok(Some(predicate))
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::new(format!(
                "predicate nested deeper than {MAX_NESTING} levels"
            )));
        }
        Ok(())
    }

    fn parse_disjunction(&mut self) -> ParseResult<Predicate> {
        let mut left = self.parse_conjunction()?;
        while self.current_token == Token::Or {
            self.advance();
            let right = self.parse_conjunction()?;
            left = Predicate::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_conjunction(&mut self) -> ParseResult<Predicate> {
        let mut left = self.parse_negation()?;
        while self.current_token == Token::And {
            self.advance();
            let right = self.parse_negation()?;
            left = Predicate::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_negation(&mut self) -> ParseResult<Predicate> {
        if self.current_token == Token::Not {
            self.advance();
            self.enter()?;
            let inner = self.parse_negation()?;
            self.depth -= 1;
            return Ok(Predicate::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Predicate> {
        if self.current_token == Token::LParen {
            self.advance();
            self.enter()?;
            let inner = self.parse_disjunction()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Predicate> {
        let left = self.parse_operand()?;
        let op = CompareOp::from_token(&self.current_token).ok_or_else(|| {
            ParseError::new(format!(
                "expected a comparison operator, found {:?}",
                self.current_token
            ))
        })?;
        self.advance();
        let right = self.parse_operand()?;

        match (left, right) {
            (Operand::Column(column), Operand::Value(value)) => {
                Ok(Predicate::Compare { column, op, value })
            }
            (Operand::Value(value), Operand::Column(column)) => Ok(Predicate::Compare {
                column,
                op: op.flipped(),
                value,
            }),
            (Operand::Column(a), Operand::Column(b)) => Err(ParseError::new(format!(
                "cannot compare column `{a}` with column `{b}`"
            ))),
            (Operand::Value(_), Operand::Value(_)) => {
                Err(ParseError::new("comparison needs a column on one side"))
            }
        }
    }

    fn parse_operand(&mut self) -> ParseResult<Operand> {
        let operand = match &self.current_token {
            Token::Ident(name) => Operand::Column(name.clone()),
            Token::Number(n) => Operand::Value(Literal::Number(*n)),
            Token::Text(s) => Operand::Value(Literal::Text(s.clone())),
            Token::Unterminated(s) => {
                return Err(ParseError::new(format!("unterminated string \"{s}\"")));
            }
            Token::Illegal(ch) => {
                return Err(ParseError::new(format!("unexpected character `{ch}`")));
            }
            other => {
                return Err(ParseError::new(format!(
                    "expected a column or literal, found {other:?}"
                )));
            }
        };
        self.advance();
        Ok(operand)
    }
}
