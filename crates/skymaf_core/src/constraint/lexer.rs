//! Scans a constraint string into tokens.
//!
//! SUPPORTED SYMBOLS:
//! - Comparison: = == != <> < <= > >=
//! - Grouping: ( )
//! - Keywords (any case): and or not
//! - Strings in single or double quotes; numbers with optional sign and exponent

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Text(String),
    Ident(String),

    And,
    Or,
    Not,

    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    LParen,
    RParen,

    /// String literal missing its closing quote
    Unterminated(String),
    Illegal(char),
    Eof,
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,
            Some('=') => {
                self.eat('=');
                Token::Equal
            }
            Some('!') => {
                if self.eat('=') {
                    Token::NotEqual
                } else {
                    Token::Illegal('!')
                }
            }
            Some('<') => {
                if self.eat('=') {
                    Token::LessEqual
                } else if self.eat('>') {
                    Token::NotEqual
                } else {
                    Token::Less
                }
            }
            Some('>') => {
                if self.eat('=') {
                    Token::GreaterEqual
                } else {
                    Token::Greater
                }
            }
            Some(quote @ ('"' | '\'')) => self.read_string(quote),
            Some(ch) if ch.is_ascii_digit() || ch == '.' || ch == '-' || ch == '+' => {
                self.read_number(ch)
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_identifier(ch),
            None => Token::Eof,
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.input.next_if(|ch| ch.is_whitespace()).is_some() {}
    }

    /// Consume `expected` if it is next
    fn eat(&mut self, expected: char) -> bool {
        self.input.next_if_eq(&expected).is_some()
    }

    fn read_string(&mut self, quote: char) -> Token {
        let mut text = String::new();
        for ch in self.input.by_ref() {
            if ch == quote {
                return Token::Text(text);
            }
            text.push(ch);
        }
        Token::Unterminated(text)
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut raw = String::from(first);
        let mut prev = first;
        while let Some(&ch) = self.input.peek() {
            let exponent_sign = (ch == '-' || ch == '+') && (prev == 'e' || prev == 'E');
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                raw.push(ch);
                prev = ch;
                self.input.next();
            } else {
                break;
            }
        }
        raw.parse().map_or(Token::Illegal(first), Token::Number)
    }

    fn read_identifier(&mut self, first: char) -> Token {
        let mut ident = String::from(first);
        while let Some(ch) = self.input.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
            ident.push(ch);
        }
        match ident.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            _ => Token::Ident(ident),
        }
    }
}
