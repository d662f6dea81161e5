//! Error types for compilation sessions

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostic;

/// Result type for quire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring, compiling or querying
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid option or option combination
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A source file could not be found or read
    #[error("cannot read {}: {message}", path.display())]
    Resolution { path: PathBuf, message: String },

    /// The engine reported errors
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Invalid selector or unexpected number of matches
    #[error("query failed: {0}")]
    Query(String),

    /// Writing output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub(crate) fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

/// A failed compilation
///
/// Holds every error the engine reported plus the warnings collected before
/// it gave up. The first diagnostic is the primary one.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    /// Errors, in the order the engine reported them
    pub diagnostics: Vec<Diagnostic>,
    /// Warnings collected during the failed compilation
    pub warnings: Vec<Diagnostic>,
}

impl CompileError {
    /// The primary diagnostic
    pub fn primary(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }

    /// Message of the primary diagnostic
    pub fn message(&self) -> &str {
        self.primary().map(|d| d.message.as_str()).unwrap_or_default()
    }

    /// Hints of the primary diagnostic
    pub fn hints(&self) -> &[String] {
        self.primary().map(|d| d.hints.as_slice()).unwrap_or_default()
    }

    /// Trace of the primary diagnostic
    pub fn trace(&self) -> &[crate::diagnostics::TraceFrame] {
        self.primary().map(|d| d.trace.as_slice()).unwrap_or_default()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation failed: {}", self.message())?;
        if self.diagnostics.len() > 1 {
            write!(f, " (and {} more errors)", self.diagnostics.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;

    #[test]
    fn test_compile_error_primary() {
        let err = CompileError {
            diagnostics: vec![
                Diagnostic::new(Severity::Error, "unknown variable: x").with_hint("define x first"),
                Diagnostic::new(Severity::Error, "second"),
            ],
            warnings: vec![],
        };

        assert_eq!(err.message(), "unknown variable: x");
        assert_eq!(err.hints(), ["define x first".to_string()]);
        assert!(err.trace().is_empty());
        assert_eq!(
            err.to_string(),
            "compilation failed: unknown variable: x (and 1 more errors)"
        );
    }

    #[test]
    fn test_empty_compile_error() {
        let err = CompileError {
            diagnostics: vec![],
            warnings: vec![],
        };
        assert_eq!(err.message(), "");
        assert!(err.hints().is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = Error::Resolution {
            path: PathBuf::from("missing.typ"),
            message: "file not found".into(),
        };
        assert_eq!(err.to_string(), "cannot read missing.typ: file not found");

        let err = Error::config("unknown format: docx");
        assert_eq!(err.to_string(), "invalid configuration: unknown format: docx");
    }
}
