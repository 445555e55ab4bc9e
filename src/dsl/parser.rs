//! Parser for the default chained-call grammar.
//!
//! Parses a token stream into a [`CallChain`]:
//!
//! ```text
//! call_chain: call ("." call)*
//! call:       IDENT "(" args? ")"
//! args:       arg ("," arg)*
//! arg:        IDENT "=" value | value
//! value:      NUMBER | STRING | BOOL | IDENT | "@" IDENT
//! ```

use super::ast::*;
use super::error::ParseError;
use super::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<CallChain, ParseError> {
        let mut calls = Vec::new();

        if self.is_at_end() {
            return Ok(CallChain::new(calls));
        }

        calls.push(self.parse_call()?);
        while self.check(&TokenKind::Dot) {
            self.advance();
            calls.push(self.parse_call()?);
        }

        if !self.is_at_end() {
            let t = self.peek();
            return Err(ParseError::syntax(
                format!("expected '.' or end of input, got {}", t.kind.describe()),
                t.line,
                t.col,
            ));
        }

        Ok(CallChain::new(calls))
    }

    fn parse_call(&mut self) -> Result<Call, ParseError> {
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            args.push(self.parse_arg()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                args.push(self.parse_arg()?);
            }
        }
        self.expect(TokenKind::RParen)?;

        Ok(Call { name, args })
    }

    fn parse_arg(&mut self) -> Result<Arg, ParseError> {
        // `IDENT =` introduces a named argument; a bare IDENT is a value.
        if let TokenKind::Ident(name) = &self.peek().kind {
            if self.peek_next_is(&TokenKind::Eq) {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.parse_value()?;
                return Ok(Arg {
                    name: Some(name),
                    value,
                });
            }
        }

        let value = self.parse_value()?;
        Ok(Arg { name: None, value })
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        let t = self.peek().clone();
        let value = match t.kind {
            TokenKind::Number(n) => Value::Number(n),
            TokenKind::Str(s) => Value::String(s),
            TokenKind::Bool(b) => Value::Bool(b),
            TokenKind::Ident(s) => Value::Identifier(s),
            TokenKind::At => {
                self.advance();
                let name = self.expect_ident()?;
                return Ok(Value::Function(name));
            }
            other => {
                return Err(ParseError::syntax(
                    format!("expected value, got {}", other.describe()),
                    t.line,
                    t.col,
                ));
            }
        };
        self.advance();
        Ok(value)
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_next_is(&self, kind: &TokenKind) -> bool {
        self.tokens
            .get(self.pos + 1)
            .is_some_and(|t| std::mem::discriminant(&t.kind) == std::mem::discriminant(kind))
    }

    fn advance(&mut self) -> &Token {
        let t = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end()
            && std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, ParseError> {
        if std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(&kind) {
            Ok(self.advance())
        } else {
            let t = self.peek();
            Err(ParseError::syntax(
                format!("expected {}, got {}", kind.describe(), t.kind.describe()),
                t.line,
                t.col,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let t = self.peek();
        match &t.kind {
            TokenKind::Ident(s) => {
                let val = s.clone();
                self.advance();
                Ok(val)
            }
            other => Err(ParseError::syntax(
                format!("expected identifier, got {}", other.describe()),
                t.line,
                t.col,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::Lexer;

    fn parse(src: &str) -> Result<CallChain, ParseError> {
        let mut lexer = Lexer::new(src);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens);
        parser.parse()
    }

    #[test]
    fn parse_empty_program() {
        let chain = parse("").unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn parse_single_call() {
        let chain = parse(r#"greet(name="World")"#).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.calls[0].name, "greet");
        assert_eq!(
            chain.calls[0].args,
            vec![Arg::named("name", Value::String("World".into()))]
        );
    }

    #[test]
    fn parse_chain_in_order() {
        let chain = parse(r#"track(name="Drums").add_clip(start=0, length=8)"#).unwrap();
        let names: Vec<_> = chain.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["track", "add_clip"]);
        assert_eq!(chain.calls[1].args[0], Arg::named("start", 0));
        assert_eq!(chain.calls[1].args[1], Arg::named("length", 8));
    }

    #[test]
    fn parse_no_arg_call() {
        let chain = parse("mute()").unwrap();
        assert!(chain.calls[0].args.is_empty());
    }

    #[test]
    fn parse_positional_and_named_mix() {
        let chain = parse("f(x=1, a, \"b\")").unwrap();
        let args = &chain.calls[0].args;
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].name.as_deref(), Some("x"));
        assert!(args[1].is_positional());
        assert_eq!(args[1].value, Value::Identifier("a".into()));
        assert_eq!(args[2].value, Value::String("b".into()));
    }

    #[test]
    fn parse_function_references() {
        let chain = parse("compose(@f, @g)").unwrap();
        let args = &chain.calls[0].args;
        assert_eq!(args[0].value, Value::Function("f".into()));
        assert_eq!(args[1].value, Value::Function("g".into()));
    }

    #[test]
    fn parse_bools() {
        let chain = parse("flag(on=true, off=false)").unwrap();
        assert_eq!(chain.calls[0].args[0].value, Value::Bool(true));
        assert_eq!(chain.calls[0].args[1].value, Value::Bool(false));
    }

    #[test]
    fn parse_multiline_chain() {
        let src = "track(name=\"Bass\")\n  .add_clip(start=4, length=4)\n  .mute()";
        let chain = parse(src).unwrap();
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn render_then_parse_is_stable() {
        let src = r#"track(name="FX", color=blue).add_clip(start=0.5, length=8).map(@square, data)"#;
        let chain = parse(src).unwrap();
        assert_eq!(parse(&chain.to_string()).unwrap(), chain);
    }

    #[test]
    fn parse_error_missing_paren() {
        let err = parse("track(name=\"Drums\"").unwrap_err();
        assert!(err.message.contains("expected ')'"), "{}", err.message);
    }

    #[test]
    fn parse_error_trailing_dot() {
        assert!(parse("track().").is_err());
    }

    #[test]
    fn parse_error_missing_value() {
        let err = parse("f(x=)").unwrap_err();
        assert!(err.message.contains("expected value"));
        assert_eq!((err.line, err.col), (1, 5));
    }

    #[test]
    fn parse_error_junk_after_chain() {
        let err = parse("a() b()").unwrap_err();
        assert!(err.message.contains("expected '.'"));
    }

    #[test]
    fn parse_error_function_ref_needs_name() {
        assert!(parse("map(@, data)").is_err());
    }
}
