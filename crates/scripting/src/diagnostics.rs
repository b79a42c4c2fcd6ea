//! Phase-tagged diagnostics
//!
//! Every pipeline phase receives the same [`ErrorReporter`] and records what
//! went wrong instead of aborting, so one pass can surface several problems.

use crate::lang::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage a diagnostic originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexing,
    Parsing,
    Resolving,
    Interpreting,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexing => write!(f, "lexing"),
            Phase::Parsing => write!(f, "parsing"),
            Phase::Resolving => write!(f, "resolving"),
            Phase::Interpreting => write!(f, "interpreting"),
        }
    }
}

/// Where a diagnostic points: a bare line, or a token's exact position
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub line: usize,
    pub column: Option<usize>,
    pub lexeme: Option<String>,
}

impl From<usize> for Location {
    fn from(line: usize) -> Self {
        Self {
            line,
            column: None,
            lexeme: None,
        }
    }
}

impl From<&Token> for Location {
    fn from(token: &Token) -> Self {
        Self {
            line: token.line,
            column: Some(token.column),
            lexeme: match token.kind {
                TokenKind::EOF => None,
                _ => Some(token.lexeme.clone()),
            },
        }
    }
}

/// A single reported problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lexeme: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} error] line {}", self.phase, self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{}", column)?;
        }
        if let Some(lexeme) = &self.lexeme {
            write!(f, " at '{}'", lexeme)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Ordered diagnostic collector shared by all phases of one run
#[derive(Debug, Clone, Default)]
pub struct ErrorReporter {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn error(&mut self, phase: Phase, position: impl Into<Location>, message: impl Into<String>) {
        let location = position.into();
        let diagnostic = Diagnostic {
            phase,
            line: location.line,
            column: location.column,
            lexeme: location.lexeme,
            message: message.into(),
        };
        tracing::debug!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Forget everything reported so far
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn has_errors_in(&self, phase: Phase) -> bool {
        self.diagnostics.iter().any(|d| d.phase == phase)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
