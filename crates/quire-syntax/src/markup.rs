//! Markup containers

use typst_syntax::ast::{self, AstNode};
use typst_syntax::{FileId, Source, VirtualPath};

use crate::expr::Expr;
use crate::node::SyntaxNode;
use crate::span::Span;

/// Virtual path used for sources handed to [`parse`]
const PARSE_PATH: &str = "/<markup>";

/// Parse markup into a syntax tree
///
/// Parsing never fails. Invalid input yields a tree whose erroneous nodes
/// describe the problems. Equal texts produce structurally equal trees, but
/// every call gets its own file id, so spans from two parses never compare
/// equal.
pub fn parse(text: &str) -> Markup {
    let id = FileId::new_fake(VirtualPath::new(PARSE_PATH));
    Markup::new(SyntaxNode::root(Source::new(id, text.to_owned())))
}

/// A sequence of markup expressions
///
/// This is the root of every parsed document and the body of headings,
/// emphasis, list items and content blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(SyntaxNode);

impl Markup {
    pub(crate) fn new(node: SyntaxNode) -> Self {
        Self(node)
    }

    /// The expressions in this markup, in source order
    ///
    /// Spaces, paragraph breaks and comments are skipped. Use
    /// [`Markup::to_untyped`] to walk every child.
    pub fn exprs(&self) -> impl Iterator<Item = Expr> + '_ {
        let parent = &self.0;
        parent
            .raw()
            .cast::<ast::Markup>()
            .unwrap_or_default()
            .exprs()
            .filter(|expr| !expr.to_untyped().kind().is_trivia())
            .map(move |expr| Expr::from_ast(parent, expr))
    }

    /// The underlying node
    pub fn to_untyped(&self) -> &SyntaxNode {
        &self.0
    }

    /// The source text covered by this markup
    pub fn text(&self) -> &str {
        self.0.source_text()
    }

    /// The location of this markup
    pub fn span(&self) -> Span {
        self.0.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let markup = parse("");
        assert_eq!(markup.exprs().count(), 0);
        assert!(markup.to_untyped().is_empty());
        assert!(!markup.to_untyped().erroneous());
    }

    #[test]
    fn test_exprs_skip_trivia() {
        let markup = parse("Hello // comment\n\nWorld");
        let variants: Vec<_> = markup.exprs().map(|expr| expr.variant()).collect();
        assert_eq!(variants, vec!["Text", "Text"]);
    }

    #[test]
    fn test_text_covers_source() {
        let markup = parse("= Title\nBody");
        assert_eq!(markup.text(), "= Title\nBody");
        assert_eq!(markup.span().range(), Some(0..12));
    }
}
