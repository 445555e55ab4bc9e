//! Lexer for the default chained-call grammar.
//!
//! Converts source text into a stream of [`Token`]s. Whitespace, including
//! newlines, is insignificant; `//` starts a comment that runs to end of line.

use super::error::ParseError;
use super::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();

            if self.is_at_end() {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    line: self.line,
                    col: self.col,
                });
                break;
            }

            let ch = self.peek();
            let token = match ch {
                '(' => self.single_char(TokenKind::LParen),
                ')' => self.single_char(TokenKind::RParen),
                ',' => self.single_char(TokenKind::Comma),
                '.' => self.single_char(TokenKind::Dot),
                '=' => self.single_char(TokenKind::Eq),
                '@' => self.single_char(TokenKind::At),
                '"' | '\'' => self.lex_string(ch)?,
                '-' => self.lex_negative_number()?,
                '0'..='9' => self.lex_number()?,
                'a'..='z' | 'A'..='Z' | '_' => self.lex_ident_or_bool(),
                _ => {
                    return Err(ParseError::lex(
                        format!("unexpected character: '{ch}'"),
                        self.line,
                        self.col,
                    ));
                }
            };

            tokens.push(token);
        }

        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_trivia(&mut self) {
        while !self.is_at_end() {
            let ch = self.peek();
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_next() == Some('/') {
                while !self.is_at_end() && self.peek() != '\n' {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let line = self.line;
        let col = self.col;
        self.advance();
        Token { kind, line, col }
    }

    fn lex_string(&mut self, quote: char) -> Result<Token, ParseError> {
        let line = self.line;
        let col = self.col;
        self.advance(); // consume opening quote
        let mut s = String::new();
        loop {
            if self.is_at_end() {
                return Err(ParseError::lex("unclosed string literal", line, col));
            }
            let ch = self.advance();
            if ch == quote {
                break;
            }
            if ch == '\\' {
                if self.is_at_end() {
                    return Err(ParseError::lex("unclosed string literal", line, col));
                }
                let escaped = self.advance();
                s.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            } else {
                s.push(ch);
            }
        }
        Ok(Token {
            kind: TokenKind::Str(s),
            line,
            col,
        })
    }

    fn lex_negative_number(&mut self) -> Result<Token, ParseError> {
        if self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            return self.lex_number();
        }
        Err(ParseError::lex("unexpected '-'", self.line, self.col))
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let line = self.line;
        let col = self.col;
        let mut s = String::new();

        if self.peek() == '-' {
            s.push(self.advance());
        }

        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance());
        }

        // A fraction needs digits after the dot; otherwise the dot chains calls.
        let is_float = !self.is_at_end()
            && self.peek() == '.'
            && self.peek_next().is_some_and(|c| c.is_ascii_digit());
        if is_float {
            s.push(self.advance()); // consume '.'
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance());
            }
        }

        let val: f64 = s
            .parse()
            .map_err(|_| ParseError::lex(format!("invalid number: {s}"), line, col))?;
        Ok(Token {
            kind: TokenKind::Number(val),
            line,
            col,
        })
    }

    fn lex_ident_or_bool(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut s = String::new();

        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            s.push(self.advance());
        }

        let kind = match s.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(s),
        };

        Token { kind, line, col }
    }
}
