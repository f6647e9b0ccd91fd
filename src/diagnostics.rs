use std::fmt;

use thiserror::Error;

/// A line/column position within a source file, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl SourcePos {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

/// Classification of a diagnostic event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Type,
    Runtime,
    Index,
    Argument,
    Syntax,
    Internal,
}

impl DiagnosticKind {
    pub fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Lex => "LexError",
            DiagnosticKind::Parse => "ParseError",
            DiagnosticKind::Type => "TypeError",
            DiagnosticKind::Runtime => "RuntimeError",
            DiagnosticKind::Index => "IndexError",
            DiagnosticKind::Argument => "ArgumentError",
            DiagnosticKind::Syntax => "SyntaxError",
            DiagnosticKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single fatal failure surfaced to end users: kind, message, and the
/// originating source position. Evaluation stops at the first one.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub pos: Option<SourcePos>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            pos: None,
        }
    }

    pub fn at(mut self, pos: SourcePos) -> Self {
        self.pos = Some(pos);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(pos) = self.pos {
            write!(f, " at {pos}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Unified error type for the Selene toolchain.
#[derive(Debug, Error)]
pub enum SeleneError {
    #[error("{0}")]
    Diagnostic(#[from] Diagnostic),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeleneError {
    /// The diagnostic kind, if this error carries one.
    pub fn diagnostic_kind(&self) -> Option<DiagnosticKind> {
        match self {
            SeleneError::Diagnostic(diag) => Some(diag.kind),
            SeleneError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SeleneError>;
