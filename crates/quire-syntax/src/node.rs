//! Untyped syntax tree
//!
//! A [`SyntaxNode`] is a handle on one node of the concrete syntax tree
//! together with the source it was parsed from. Cloning a node is cheap: the
//! tree itself is reference counted and never duplicated.

use std::fmt;

use typst_syntax::Source;

use crate::kind::SyntaxKind;
use crate::span::Span;

/// A node in the concrete syntax tree
#[derive(Clone)]
pub struct SyntaxNode {
    node: typst_syntax::SyntaxNode,
    source: Source,
}

/// A syntax error found somewhere in a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Error message
    pub message: String,
    /// Location of the offending node
    pub span: Span,
    /// Hints on how to fix the error
    pub hints: Vec<String>,
}

impl SyntaxNode {
    /// The root node of a parsed source
    pub fn root(source: Source) -> Self {
        let node = source.root().clone();
        Self { node, source }
    }

    pub(crate) fn child_of(&self, node: typst_syntax::SyntaxNode) -> Self {
        Self {
            node,
            source: self.source.clone(),
        }
    }

    /// The kind of the node
    pub fn kind(&self) -> SyntaxKind {
        self.node.kind().into()
    }

    /// The text of the node
    ///
    /// Only leaves carry text; inner nodes return an empty string.
    pub fn text(&self) -> &str {
        self.node.text().as_str()
    }

    /// The full source text covered by the node, including descendants
    pub fn source_text(&self) -> &str {
        self.source
            .range(self.node.span())
            .and_then(|range| self.source.get(range))
            .unwrap_or_default()
    }

    /// The child nodes, in source order
    pub fn children(&self) -> impl ExactSizeIterator<Item = SyntaxNode> + '_ {
        self.node.children().map(|child| self.child_of(child.clone()))
    }

    /// The location of the node
    pub fn span(&self) -> Span {
        Span::resolve(self.node.span(), Some(&self.source))
    }

    /// Whether the node or any of its descendants is an error
    pub fn erroneous(&self) -> bool {
        self.node.erroneous()
    }

    /// The syntax errors of this node and its descendants
    pub fn errors(&self) -> Vec<SyntaxError> {
        self.node
            .errors()
            .into_iter()
            .map(|error| SyntaxError {
                message: error.message.to_string(),
                span: Span::resolve(error.span, Some(&self.source)),
                hints: error.hints.iter().map(|hint| hint.to_string()).collect(),
            })
            .collect()
    }

    /// Whether the node covers no source text
    pub fn is_empty(&self) -> bool {
        self.node.is_empty()
    }

    /// The byte length of the source text covered by the node
    pub fn len(&self) -> usize {
        self.node.len()
    }

    /// Whether two nodes are the same apart from their spans
    pub fn spanless_eq(&self, other: &Self) -> bool {
        self.node.spanless_eq(&other.node)
    }

    /// The source this node belongs to
    pub fn source(&self) -> &Source {
        &self.source
    }

    pub(crate) fn raw(&self) -> &typst_syntax::SyntaxNode {
        &self.node
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(text: &str) -> SyntaxNode {
        SyntaxNode::root(Source::detached(text))
    }

    #[test]
    fn test_inner_nodes_have_no_text() {
        let node = root("= Title");
        assert_eq!(node.kind().name(), "markup");
        assert_eq!(node.text(), "");
        assert_eq!(node.source_text(), "= Title");
        assert_eq!(node.len(), 7);
        assert!(!node.is_empty());
    }

    #[test]
    fn test_leaf_text() {
        let node = root("hello");
        let leaf = node.children().next().unwrap();
        assert_eq!(leaf.kind().name(), "text");
        assert_eq!(leaf.text(), "hello");
        assert_eq!(leaf.children().len(), 0);
    }

    #[test]
    fn test_erroneous_propagates_to_root() {
        let node = root("#let x = ");
        assert!(node.erroneous());
        assert!(!node.errors().is_empty());
        assert!(node.children().any(|child| child.erroneous()));
    }

    #[test]
    fn test_valid_source_has_no_errors() {
        let node = root("= Heading\n\nSome *strong* text.");
        assert!(!node.erroneous());
        assert!(node.errors().is_empty());
    }

    #[test]
    fn test_spans_resolve_to_byte_ranges() {
        let node = root("a *b*");
        let strong = node
            .children()
            .find(|child| child.kind().name() == "strong content")
            .unwrap();
        assert_eq!(strong.span().range(), Some(2..5));
    }
}
