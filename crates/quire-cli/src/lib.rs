//! quire CLI - Command-line interface library
//!
//! This library provides the CLI functionality for quire:
//! - Compile: render a document to PDF, SVG, PNG or HTML
//! - Query: extract elements of a compiled document as JSON or YAML
//! - Fonts: list the fonts a document can use
//! - Parse: show the top-level syntax tree of a document
//!
//! # Binary Usage
//!
//! ```bash
//! # Compile to PDF next to the input
//! quire compile report.typ
//!
//! # One SVG per page, with a sys.inputs entry
//! quire compile report.typ "pages/page-{n}.svg" --input version=1.2
//!
//! # All level one headings as YAML
//! quire query report.typ "heading.where(level: 1)" --format yaml
//!
//! # Font families, ignoring system fonts
//! quire fonts --ignore-system-fonts
//! ```

pub mod app;

// Re-export main entry point and types
pub use app::{compile_command, fonts_command, load_settings, parse_command, query_command};
pub use app::{run_cli, CompileArgs, FontArgs, FontsArgs, ListingFormat, QueryArgs, WorldArgs};
