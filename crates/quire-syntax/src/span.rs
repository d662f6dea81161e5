//! Source locations
//!
//! A [`Span`] identifies where a syntax node or diagnostic came from. Two
//! spans are equal when they point at the same byte range of the same file,
//! regardless of the text found there.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

use typst_syntax::{FileId, Source};

/// A location in a source file
#[derive(Clone)]
pub struct Span {
    raw: typst_syntax::Span,
    range: Option<Range<usize>>,
}

impl Span {
    /// A span that does not point into any source
    pub fn detached() -> Self {
        Self {
            raw: typst_syntax::Span::detached(),
            range: None,
        }
    }

    /// Wrap an engine span, resolving its byte range against `source` when
    /// the span belongs to it
    pub fn resolve(raw: typst_syntax::Span, source: Option<&Source>) -> Self {
        let range = source
            .filter(|source| raw.id() == Some(source.id()))
            .and_then(|source| source.range(raw));
        Self { raw, range }
    }

    /// Wrap an engine span whose byte range was resolved elsewhere
    pub fn with_range(raw: typst_syntax::Span, range: Option<Range<usize>>) -> Self {
        Self { raw, range }
    }

    /// Whether the span is not associated with any source file
    pub fn is_detached(&self) -> bool {
        self.raw.is_detached()
    }

    /// The file this span points into
    pub fn file(&self) -> Option<FileId> {
        self.raw.id()
    }

    /// The byte range in the file, when it could be resolved
    pub fn range(&self) -> Option<Range<usize>> {
        self.range.clone()
    }

    /// The underlying engine span
    pub fn into_raw(self) -> typst_syntax::Span {
        self.raw
    }

    /// The underlying engine span, by reference
    pub fn raw(&self) -> typst_syntax::Span {
        self.raw
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::detached()
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        self.file() == other.file() && self.range == other.range
    }
}

impl Eq for Span {}

impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file().hash(state);
        self.range.hash(state);
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.file(), &self.range) {
            (None, _) => write!(f, "Span(detached)"),
            (Some(id), Some(range)) => write!(
                f,
                "Span({}, {}..{})",
                id.vpath().as_rootless_path().display(),
                range.start,
                range.end
            ),
            (Some(id), None) => {
                write!(f, "Span({})", id.vpath().as_rootless_path().display())
            }
        }
    }
}
