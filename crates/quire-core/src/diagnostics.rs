//! Compiler diagnostics
//!
//! The engine reports errors and warnings with spans that only make sense
//! together with the world that produced them. This module translates them
//! into self-contained [`Diagnostic`] values: message, hints, resolved
//! location and the trace of call sites that led to the problem.
//!
//! [`render`] prints diagnostics for humans, with the offending source lines
//! excerpted. The `Display` impl is a compact single-block form for logs.

use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic as Report, Label};
use codespan_reporting::term::{self, termcolor};
use serde::{Deserialize, Serialize};
use typst::diag::{self, SourceDiagnostic};
use typst::syntax::{FileId, Span as EngineSpan};
use tracing::debug;
use typst::World;

use quire_syntax::Span;

use crate::world::SystemWorld;

/// A diagnostic message from the engine
///
/// # Example
///
/// ```
/// use quire_core::diagnostics::{Diagnostic, Severity};
///
/// let diag = Diagnostic::new(Severity::Warning, "unused variable")
///     .with_hint("prefix the name with an underscore");
/// assert!(diag.is_warning());
/// assert_eq!(diag.hints.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level of the diagnostic
    pub severity: Severity,

    /// The diagnostic message
    pub message: String,

    /// Where the problem occurred
    #[serde(skip)]
    pub span: Span,

    /// The resolved location, when the span points into a readable file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Hints on how to fix the problem
    #[serde(default)]
    pub hints: Vec<String>,

    /// Call sites that led to the problem, innermost first
    #[serde(default)]
    pub trace: Vec<TraceFrame>,
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Warning, the document still compiled
    Warning,

    /// Error, compilation failed
    Error,
}

/// One frame of a diagnostic trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// What happened at this point, e.g. "error occurred in this call"
    pub message: String,

    #[serde(skip)]
    pub span: Span,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// A resolved source location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the project root, prefixed with the package
    /// spec for package files
    pub file: String,

    /// Start byte offset (inclusive)
    pub start: usize,

    /// End byte offset (exclusive)
    pub end: usize,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            span: Span::detached(),
            location: None,
            hints: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Add a hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Set the resolved location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a trace frame
    pub fn with_frame(mut self, frame: TraceFrame) -> Self {
        self.trace.push(frame);
        self
    }

    /// Check if this is an error-level diagnostic
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// Check if this is a warning-level diagnostic
    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }

    /// Translate an engine diagnostic, resolving spans through `world`
    pub fn from_engine(world: &dyn World, diagnostic: &SourceDiagnostic) -> Self {
        let severity = match diagnostic.severity {
            diag::Severity::Error => Severity::Error,
            diag::Severity::Warning => Severity::Warning,
        };

        let (span, location) = resolve(world, diagnostic.span);
        let trace = diagnostic
            .trace
            .iter()
            .map(|point| {
                let (span, location) = resolve(world, point.span);
                TraceFrame {
                    message: point.v.to_string(),
                    span,
                    location,
                }
            })
            .collect();

        Self {
            severity,
            message: diagnostic.message.to_string(),
            span,
            location,
            hints: diagnostic.hints.iter().map(|hint| hint.to_string()).collect(),
            trace,
        }
    }
}

/// Translate a batch of engine diagnostics
pub fn translate(world: &dyn World, diagnostics: &[SourceDiagnostic]) -> Vec<Diagnostic> {
    diagnostics
        .iter()
        .map(|diagnostic| Diagnostic::from_engine(world, diagnostic))
        .collect()
}

/// Resolve an engine span into our span plus a human readable location
fn resolve(world: &dyn World, span: EngineSpan) -> (Span, Option<Location>) {
    let Some(id) = span.id() else {
        return (Span::detached(), None);
    };
    let Ok(source) = world.source(id) else {
        return (Span::with_range(span, None), None);
    };
    let Some(range) = source.range(span) else {
        return (Span::with_range(span, None), None);
    };

    let location = source
        .byte_to_line(range.start)
        .zip(source.byte_to_column(range.start))
        .map(|(line, column)| Location {
            file: display_path(id),
            start: range.start,
            end: range.end,
            line: line + 1,
            column: column + 1,
        });

    (Span::with_range(span, Some(range)), location)
}

/// Render diagnostics as terminal text with source excerpts
///
/// Trace frames follow their diagnostic as `help` entries. A diagnostic
/// whose source can no longer be read falls back to its compact form.
pub fn render(world: &SystemWorld, diagnostics: &[Diagnostic]) -> String {
    let config = term::Config {
        tab_width: 2,
        ..Default::default()
    };

    let mut out = String::new();
    for diagnostic in diagnostics {
        let mut buffer = termcolor::Buffer::no_color();
        let emitted = reports(diagnostic)
            .iter()
            .try_for_each(|report| term::emit(&mut buffer, &config, world, report));

        match emitted {
            Ok(()) => out.push_str(&String::from_utf8_lossy(buffer.as_slice())),
            Err(err) => {
                debug!(%err, "source excerpt unavailable");
                out.push_str(&format!("{diagnostic}\n"));
            }
        }
    }
    out
}

/// The diagnostic itself followed by one `help` report per trace frame
fn reports(diagnostic: &Diagnostic) -> Vec<Report<FileId>> {
    let head = match diagnostic.severity {
        Severity::Error => Report::error(),
        Severity::Warning => Report::warning(),
    }
    .with_message(&diagnostic.message)
    .with_notes(
        diagnostic
            .hints
            .iter()
            .map(|hint| format!("hint: {hint}"))
            .collect(),
    )
    .with_labels(label(&diagnostic.span));

    let frames = diagnostic.trace.iter().map(|frame| {
        Report::help()
            .with_message(&frame.message)
            .with_labels(label(&frame.span))
    });

    std::iter::once(head).chain(frames).collect()
}

fn label(span: &Span) -> Vec<Label<FileId>> {
    span.file()
        .zip(span.range())
        .map(|(id, range)| Label::primary(id, range))
        .into_iter()
        .collect()
}

/// Printable name of a file, `@preview/pkg:1.0.0/lib.typ` for package files
pub fn display_path(id: FileId) -> String {
    let path = id.vpath().as_rootless_path().display().to_string();
    match id.package() {
        Some(spec) => format!("{spec}/{path}"),
        None => path,
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format: severity: message
        write!(f, "{}: {}", self.severity, self.message)?;

        if let Some(ref location) = self.location {
            write!(f, "\n  --> {}", location)?;
        }

        for hint in &self.hints {
            write!(f, "\n  = hint: {}", hint)?;
        }

        for frame in &self.trace {
            write!(f, "\n  = trace: {}", frame.message)?;
            if let Some(ref location) = frame.location {
                write!(f, " ({})", location)?;
            }
        }

        Ok(())
    }
}
