use thiserror::Error;

use crate::ast::Span;

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

/// A single source diagnostic with a byte span into the offending text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn lex(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Lex,
            span,
            message: message.into(),
        }
    }

    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..{}: {}",
            self.span.start, self.span.end, self.message
        )
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("invalid token")]
    InvalidToken,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
}

impl Default for LexErrorKind {
    #[inline]
    fn default() -> Self {
        LexErrorKind::InvalidToken
    }
}

/// Errors surfaced by pattern compilation and pipeline execution.
///
/// Unification itself never errors; a candidate that cannot bind simply does
/// not appear in the output. These are the failures that abort a pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot parse pattern: {}", fmt_diags(.0))]
    Parse(Vec<Diag>),

    #[error("unknown command {0:?} (expected x, g, v or s)")]
    UnknownCommand(String),

    #[error("cannot resolve {name:?} in scope")]
    Resolve { name: String },

    #[error("unknown package {path:?}")]
    UnknownImport { path: String },

    #[error("wildcard ${name} is not bound by an earlier match")]
    Unbound { name: String },

    #[error("substitute command carries no replacement source")]
    NoReplacement,
}

fn fmt_diags(diags: &[Diag]) -> String {
    match diags.first() {
        Some(d) if diags.len() == 1 => d.to_string(),
        Some(d) => format!("{} (+{} more)", d, diags.len() - 1),
        None => "unknown error".to_string(),
    }
}
