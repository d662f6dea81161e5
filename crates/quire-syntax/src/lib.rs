//! quire-syntax - Syntax trees for Typst markup
//!
//! This crate parses markup into the engine's concrete syntax tree and
//! exposes two views over it:
//!
//! - [`SyntaxNode`]: the untyped, error tolerant tree (kind, text, children,
//!   span, error flag)
//! - [`Expr`]: a typed view with one variant per grammar production
//!
//! Both views share the same reference counted tree. Parsing never fails;
//! invalid input produces nodes flagged as erroneous.
//!
//! # Example
//!
//! ```
//! use quire_syntax::{parse, Expr};
//!
//! let markup = parse("= Hello\nWorld");
//! let first = markup.exprs().next().unwrap();
//! assert_eq!(first.variant(), "Heading");
//! if let Expr::Heading(heading) = first {
//!     assert_eq!(heading.depth().get(), 1);
//! }
//! ```

pub mod expr;
pub mod kind;
pub mod markup;
pub mod node;
pub mod span;

pub use expr::{Arg, ArrayItem, DictItem, Expr};
pub use kind::SyntaxKind;
pub use markup::{parse, Markup};
pub use node::{SyntaxError, SyntaxNode};
pub use span::Span;
pub use typst_syntax::FileId;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
