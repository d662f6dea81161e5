//! Grammar production tags

use std::fmt;

/// The kind of a syntax node
///
/// The set of kinds is fixed by the markup grammar. Kinds compare by
/// identity and are cheap to copy.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntaxKind(typst_syntax::SyntaxKind);

impl SyntaxKind {
    /// The symbolic name of the kind, e.g. `heading` or `line comment`
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Whether the kind carries no meaning (spaces, paragraph breaks and
    /// comments)
    pub fn is_trivia(self) -> bool {
        self.0.is_trivia()
    }

    /// Whether the kind is a keyword such as `let` or `show`
    pub fn is_keyword(self) -> bool {
        self.0.is_keyword()
    }

    /// Whether the kind marks a syntax error
    pub fn is_error(self) -> bool {
        self.0.is_error()
    }

    /// The engine's tag
    pub fn raw(self) -> typst_syntax::SyntaxKind {
        self.0
    }
}

impl From<typst_syntax::SyntaxKind> for SyntaxKind {
    fn from(kind: typst_syntax::SyntaxKind) -> Self {
        Self(kind)
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
