//! Error types shared across the interpreter, runtime and engine.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::dsl::ParseError;
use crate::interpreter::args::ArgError;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Crate-level result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure surfaced by an engine. The first error aborts the chain.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("unknown call: {name}")]
    UnknownCall { name: String },

    #[error("call {call} failed: {source}")]
    Handler {
        call: String,
        #[source]
        source: HandlerError,
    },

    #[error("action {kind} failed: {source}")]
    Runtime {
        kind: String,
        #[source]
        source: RuntimeError,
    },

    #[error("cancelled after {completed} step(s)")]
    Cancelled { completed: usize },

    #[error("stream producer stopped without a terminal event")]
    ProducerPanicked,
}

impl Error {
    /// Name of the failing call, for unknown-call and handler errors.
    pub fn call_name(&self) -> Option<&str> {
        match self {
            Error::UnknownCall { name } => Some(name),
            Error::Handler { call, .. } => Some(call),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

/// Failure signalled by a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Arg(#[from] ArgError),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(BoxError),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }

    pub fn other(err: impl StdError + Send + Sync + 'static) -> Self {
        HandlerError::Other(Box::new(err))
    }
}

/// Failure signalled by a [`Runtime`](crate::runtime::Runtime) while executing an action.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unsupported action kind: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(BoxError),
}

impl RuntimeError {
    pub fn msg(message: impl Into<String>) -> Self {
        RuntimeError::Message(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_are_marked() {
        let err = Error::from(ParseError::syntax("expected ')'", 1, 5));
        assert!(err.to_string().starts_with("parse error: "));
    }

    #[test]
    fn handler_errors_name_the_call() {
        let err = Error::Handler {
            call: "add_clip".into(),
            source: HandlerError::msg("length must be positive"),
        };
        assert_eq!(err.to_string(), "call add_clip failed: length must be positive");
        assert_eq!(err.call_name(), Some("add_clip"));
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn runtime_errors_name_the_action_kind() {
        let err = Error::Runtime {
            kind: "create_track".into(),
            source: RuntimeError::Unsupported("create_track".into()),
        };
        assert!(err.to_string().starts_with("action create_track failed"));
        assert_eq!(err.call_name(), None);
    }

    #[test]
    fn errors_cross_threads() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<Error>();
    }
}
