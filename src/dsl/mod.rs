//! DSL front end: source text → tokens → [`CallChain`].
//!
//! The interpreter only depends on [`ParserBackend`]; [`DefaultParser`] is the
//! built-in hand-written backend for the default chained-call grammar.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind};

use lexer::Lexer;
use parser::Parser;

/// Grammar accepted by [`DefaultParser`], in Lark notation.
///
/// Exported as-is for tooling; run it through [`crate::cfg::clean_grammar_for_cfg`]
/// before handing it to a CFG-constrained model.
pub const DEFAULT_GRAMMAR: &str = r#"
start: call_chain

call_chain: call (DOT call)*
call: IDENTIFIER "(" args? ")"
args: arg (COMMA arg)*
arg: IDENTIFIER "=" value
    | value

value: NUMBER
     | STRING
     | BOOL
     | IDENTIFIER
     | function_ref

function_ref: "@" IDENTIFIER

DOT: "."
COMMA: ","
NUMBER: /-?\d+(\.\d+)?/
STRING: /"([^"\\]|\\.)*"|'([^'\\]|\\.)*'/
IDENTIFIER: /[a-zA-Z_][a-zA-Z0-9_]*/
BOOL: "true" | "false"

%import common.WS
%ignore WS
"#;

/// Turns source text into a [`CallChain`].
///
/// Any conforming implementation can be plugged into an engine; the core never
/// parses text itself.
pub trait ParserBackend: Send + Sync {
    fn parse(&self, source: &str) -> Result<CallChain, ParseError>;
}

impl<F> ParserBackend for F
where
    F: Fn(&str) -> Result<CallChain, ParseError> + Send + Sync,
{
    fn parse(&self, source: &str) -> Result<CallChain, ParseError> {
        self(source)
    }
}

/// The built-in parser for [`DEFAULT_GRAMMAR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl DefaultParser {
    /// Parse DSL source into a CallChain.
    pub fn parse_source(source: &str) -> Result<CallChain, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens);
        parser.parse()
    }
}

impl ParserBackend for DefaultParser {
    fn parse(&self, source: &str) -> Result<CallChain, ParseError> {
        Self::parse_source(source)
    }
}
