use std::fmt;

use crate::span::Span;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic raised by the scanner, parser, or emitter.
///
/// Deliberately minimal: no source-snippet rendering, no note/help chains,
/// no batching. A `Severity::Error` diagnostic is fatal and the first one
/// produced aborts compilation; `Severity::Warning` is scanner-only and
/// never stops the pipeline.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub current_token: Option<String>,
}

impl Diagnostic {
    /// A fatal diagnostic, reported with the line and the lexeme the
    /// parser or emitter was looking at when it gave up.
    pub fn error(message: impl Into<String>, span: Span, current_token: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            current_token: Some(current_token.into()),
        }
    }

    /// A fatal diagnostic raised by the emitter, identified by an AST
    /// node's provenance rather than a parser cursor — there is no
    /// "current token" once parsing has finished.
    pub fn emitter_error(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span,
            current_token: None,
        }
    }

    /// A non-fatal diagnostic. Only the scanner raises these.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            span,
            current_token: None,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.severity, &self.current_token) {
            (Severity::Error, Some(tok)) => write!(
                f,
                "Line: {} | {} | Current token is => {}",
                self.span.line, self.message, tok
            ),
            (Severity::Error, None) => write!(f, "Line: {} | {}", self.span.line, self.message),
            (Severity::Warning, _) => write!(f, "Line {}: {}", self.span.line, self.message),
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Print a scanner warning to the error stream. Never aborts.
pub fn report_warning(diagnostic: &Diagnostic) {
    eprintln!("Warning: {diagnostic}");
}

/// The top-level error type returned by the driver. Wraps the fatal
/// diagnostics raised by the compiler stages alongside the I/O failures
/// that surround them.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
