//! Error types for the scripting crate

use crate::diagnostics::{Location, Phase};
use crate::lang::token::Token;
use crate::runtime::value::Arity;
use hsl_core::HslError;

/// Script-level failures surfaced by [`crate::ScriptContext::into_result`]
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Front end reported diagnostics; nothing was executed
    #[error("Script rejected during {phase}: {count} diagnostic(s)")]
    Rejected { phase: Phase, count: usize },

    /// Execution aborted
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Script file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ScriptError> for HslError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Io(err) => HslError::Io(err),
            other => HslError::Script(other.to_string()),
        }
    }
}

/// Result type for scripting operations
pub type Result<T> = std::result::Result<T, ScriptError>;

/// What went wrong while interpreting
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("Expected {expected} arguments but got {got}.")]
    Arity { expected: Arity, got: usize },

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Only instances have {0}.")]
    NotAnInstance(&'static str),

    #[error("Index {index} out of range for length {len}.")]
    IndexOutOfRange { index: f64, len: usize },

    #[error("Stack overflow: call depth exceeded {0}.")]
    StackOverflow(usize),

    #[error("Can't use '{0}' outside of a loop.")]
    StrayControl(&'static str),

    #[error("Can't return from a test block.")]
    ReturnFromTest,

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Failure raised by a native function
    #[error("{0}")]
    Native(String),
}

/// A runtime failure with the source position that triggered it
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub line: usize,
    pub column: Option<usize>,
}

impl RuntimeError {
    /// Error positioned at `token`
    pub fn new(kind: RuntimeErrorKind, token: &Token) -> Self {
        Self {
            kind,
            line: token.line,
            column: Some(token.column),
        }
    }

    /// Error known only by line
    pub fn at_line(kind: RuntimeErrorKind, line: usize) -> Self {
        Self {
            kind,
            line,
            column: None,
        }
    }
}

impl From<&RuntimeError> for Location {
    fn from(err: &RuntimeError) -> Self {
        Self {
            line: err.line,
            column: err.column,
            lexeme: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::token::TokenKind;

    #[test]
    fn test_runtime_error_position() {
        let token = Token::new(TokenKind::Identifier, "x", 4, 9);
        let err = RuntimeError::new(RuntimeErrorKind::UndefinedVariable("x".into()), &token);
        assert_eq!(err.line, 4);
        assert_eq!(err.column, Some(9));
        assert_eq!(err.to_string(), "Undefined variable 'x'.");
    }

    #[test]
    fn test_arity_message() {
        let kind = RuntimeErrorKind::Arity {
            expected: Arity::Exact(2),
            got: 1,
        };
        assert_eq!(kind.to_string(), "Expected 2 arguments but got 1.");
    }

    #[test]
    fn test_into_hsl_error() {
        let err: HslError = ScriptError::Rejected {
            phase: Phase::Parsing,
            count: 2,
        }
        .into();
        assert!(matches!(err, HslError::Script(msg) if msg.contains("parsing")));
    }
}
