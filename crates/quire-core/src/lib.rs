//! quire-core - Compile, render and query documents
//!
//! Boundary layer over the Typst engine. A [`Session`] turns markup, held in
//! memory or read from a file, into PDF, SVG, PNG or HTML, reports engine
//! failures as structured [`Diagnostic`] values and answers selector queries
//! against the compiled document.
//!
//! # Example
//!
//! ```
//! use quire_core::{CompileOptions, FontOptions, Input, OutputFormat, SessionBuilder};
//!
//! let mut session = SessionBuilder::new()
//!     .with_input(Input::text("= Hello\n\nWorld"))
//!     .with_font_options(FontOptions::embedded_only())
//!     .build()
//!     .unwrap();
//!
//! let pdf = session
//!     .compile(CompileOptions::new(OutputFormat::Pdf))
//!     .unwrap()
//!     .into_document()
//!     .unwrap();
//! assert!(pdf.starts_with(b"%PDF-"));
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fonts;
pub mod output;
pub mod package;
pub mod query;
pub mod session;
pub mod world;

// Re-export main types
pub use config::Settings;
pub use diagnostics::{Diagnostic, Location, Severity, TraceFrame};
pub use error::{CompileError, Error, Result};
pub use fonts::{FontCatalog, FontInfo, FontOptions};
pub use output::{CompileOutcome, OutputFormat};
pub use package::PackageStorage;
pub use query::{QueryOptions, SerializationFormat};
pub use session::{CompileOptions, Input, Session, SessionBuilder, SysInputs};
pub use world::SystemWorld;

/// Compile once with a throwaway session
pub fn compile(options: CompileOptions, fonts: FontOptions) -> Result<CompileOutcome> {
    compile_with_warnings(options, fonts).map(|(outcome, _)| outcome)
}

/// Compile once with a throwaway session, returning the warnings too
pub fn compile_with_warnings(
    options: CompileOptions,
    fonts: FontOptions,
) -> Result<(CompileOutcome, Vec<Diagnostic>)> {
    SessionBuilder::new()
        .with_font_options(fonts)
        .build()?
        .compile_with_warnings(options)
}

/// Query `input` once with a throwaway session
pub fn query(input: Input, options: &QueryOptions, fonts: FontOptions) -> Result<String> {
    SessionBuilder::new()
        .with_input(input)
        .with_font_options(fonts)
        .build()?
        .query(options)
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_one_shot_compile() {
        let options = CompileOptions::new(OutputFormat::Svg).with_input(Input::text("= One"));
        let pages = compile(options, FontOptions::embedded_only())
            .unwrap()
            .into_pages()
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert!(String::from_utf8_lossy(&pages[0]).contains("<svg"));
    }
}
