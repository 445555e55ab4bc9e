//! Error types for parser backends.

use thiserror::Error;

/// An error that occurred while turning source text into a [`CallChain`].
///
/// [`CallChain`]: super::ast::CallChain
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{line}:{col}] {kind}: {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Invalid characters or malformed literals.
    Lex,
    /// Tokens in an order the grammar does not accept.
    Syntax,
    /// Reported by an external backend without position information.
    Backend,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParseErrorKind::Lex => "lex error",
            ParseErrorKind::Syntax => "syntax error",
            ParseErrorKind::Backend => "backend error",
        };
        f.write_str(name)
    }
}

impl ParseError {
    pub fn lex(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: message.into(),
            line,
            col,
            kind: ParseErrorKind::Lex,
        }
    }

    pub fn syntax(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            message: message.into(),
            line,
            col,
            kind: ParseErrorKind::Syntax,
        }
    }

    /// For third-party backends that cannot report a position.
    pub fn backend(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: 0,
            col: 0,
            kind: ParseErrorKind::Backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position_and_kind() {
        let err = ParseError::syntax("expected ')'", 1, 7);
        assert_eq!(err.to_string(), "[1:7] syntax error: expected ')'");
    }

    #[test]
    fn backend_errors_have_no_position() {
        let err = ParseError::backend("grammar rejected input");
        assert_eq!(err.kind, ParseErrorKind::Backend);
        assert_eq!((err.line, err.col), (0, 0));
    }
}
