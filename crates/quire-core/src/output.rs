//! Output formats and export
//!
//! Each format has a fixed shape: `pdf` and `html` always produce one blob,
//! `svg` and `png` always produce one blob per page, even for single page
//! documents. When an output path is given the bytes go to disk instead of
//! being returned.
//!
//! The engine has no HTML exporter, so `html` is a page wrapping the SVG of
//! every laid out page. It is not semantic HTML: headings, paragraphs and
//! links are drawn, not marked up.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use typst::foundations::{Datetime, Smart};
use typst::model::Document;
use typst::visualize::Color;

use crate::error::{Error, Result};

/// Resolution used for PNG export when none is given
pub const DEFAULT_PPI: f32 = 144.0;

/// Placeholder replaced by the page number in output paths
const PAGE_PLACEHOLDER: &str = "{n}";

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Svg,
    Png,
    Html,
}

impl OutputFormat {
    /// Whether the format yields one blob per page
    pub fn is_paged(self) -> bool {
        matches!(self, OutputFormat::Svg | OutputFormat::Png)
    }

    /// File extension, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Html => "html",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    /// Parse a format name; names are case-sensitive
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(OutputFormat::Pdf),
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "html" => Ok(OutputFormat::Html),
            other => Err(Error::config(format!(
                "unknown output format `{other}` (expected pdf, svg, png or html)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The result of one compile call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// A single blob (`pdf`, `html`)
    Document(Vec<u8>),
    /// One blob per page, in page order (`svg`, `png`)
    Pages(Vec<Vec<u8>>),
    /// The output went to these files
    Written(Vec<PathBuf>),
}

impl CompileOutcome {
    /// The single blob, if this is one
    pub fn as_document(&self) -> Option<&[u8]> {
        match self {
            CompileOutcome::Document(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The page blobs, if this is a page sequence
    pub fn as_pages(&self) -> Option<&[Vec<u8>]> {
        match self {
            CompileOutcome::Pages(pages) => Some(pages),
            _ => None,
        }
    }

    /// Consume into the single blob
    pub fn into_document(self) -> Option<Vec<u8>> {
        match self {
            CompileOutcome::Document(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Consume into the page blobs
    pub fn into_pages(self) -> Option<Vec<Vec<u8>>> {
        match self {
            CompileOutcome::Pages(pages) => Some(pages),
            _ => None,
        }
    }
}

/// Export a laid out document
pub fn export(
    document: &Document,
    format: OutputFormat,
    ppi: Option<f32>,
    timestamp: Option<Datetime>,
) -> Result<CompileOutcome> {
    let outcome = match format {
        OutputFormat::Pdf => {
            CompileOutcome::Document(typst_pdf::pdf(document, Smart::Auto, timestamp))
        }
        OutputFormat::Html => CompileOutcome::Document(html(document).into_bytes()),
        OutputFormat::Svg => CompileOutcome::Pages(
            document
                .pages
                .iter()
                .map(|page| typst_svg::svg(&page.frame).into_bytes())
                .collect(),
        ),
        OutputFormat::Png => {
            let pixel_per_pt = pixel_per_pt(ppi)?;
            let pages = document
                .pages
                .iter()
                .map(|page| {
                    typst_render::render(&page.frame, pixel_per_pt, Color::WHITE)
                        .encode_png()
                        .map_err(|err| Error::Io(std::io::Error::other(err.to_string())))
                })
                .collect::<Result<Vec<_>>>()?;
            CompileOutcome::Pages(pages)
        }
    };

    debug!(%format, pages = document.pages.len(), "exported document");
    Ok(outcome)
}

/// Write an export to `output`
///
/// Single blobs go to `output` itself. Page sequences go to one file per
/// page, see [`page_path`].
pub fn write(outcome: CompileOutcome, output: &Path) -> Result<CompileOutcome> {
    let written = match outcome {
        CompileOutcome::Document(bytes) => {
            fs::write(output, bytes)?;
            vec![output.to_path_buf()]
        }
        CompileOutcome::Pages(pages) => {
            let total = pages.len();
            let mut written = Vec::with_capacity(total);
            for (i, page) in pages.into_iter().enumerate() {
                let path = page_path(output, i + 1, total);
                fs::write(&path, page)?;
                written.push(path);
            }
            written
        }
        CompileOutcome::Written(paths) => paths,
    };

    debug!(files = written.len(), "wrote output");
    Ok(CompileOutcome::Written(written))
}

/// The file a page is written to
///
/// A `{n}` in the file name is replaced by the 1-based page number. Without
/// it a single page goes to `output` itself and multiple pages go to
/// `<stem>-<n>.<ext>` next to it.
pub fn page_path(output: &Path, page: usize, total: usize) -> PathBuf {
    let name = output
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    if name.contains(PAGE_PLACEHOLDER) {
        return output.with_file_name(name.replace(PAGE_PLACEHOLDER, &page.to_string()));
    }
    if total <= 1 {
        return output.to_path_buf();
    }

    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = match output.extension() {
        Some(ext) => format!("{stem}-{page}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{page}"),
    };
    output.with_file_name(file)
}

fn pixel_per_pt(ppi: Option<f32>) -> Result<f32> {
    let ppi = ppi.unwrap_or(DEFAULT_PPI);
    if ppi.is_finite() && ppi > 0.0 {
        Ok(ppi / 72.0)
    } else {
        Err(Error::config(format!("ppi must be a positive number, got {ppi}")))
    }
}

/// Standalone HTML page embedding every page as inline SVG
///
/// Only the document title is carried over as text.
fn html(document: &Document) -> String {
    let title = document.title.as_deref().unwrap_or("Document");
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    out.push_str("</head>\n<body>\n");
    for page in &document.pages {
        out.push_str("<div class=\"page\">\n");
        out.push_str(&typst_svg::svg(&page.frame));
        out.push_str("\n</div>\n");
    }
    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing_is_case_sensitive() {
        assert_eq!("pdf".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!(matches!("PDF".parse::<OutputFormat>(), Err(Error::Config(_))));
        assert!(matches!("docx".parse::<OutputFormat>(), Err(Error::Config(_))));
    }

    #[test]
    fn test_format_shape() {
        assert!(!OutputFormat::Pdf.is_paged());
        assert!(!OutputFormat::Html.is_paged());
        assert!(OutputFormat::Svg.is_paged());
        assert!(OutputFormat::Png.is_paged());
        assert_eq!(OutputFormat::Png.to_string(), "png");
    }

    #[test]
    fn test_page_path_placeholder() {
        let path = page_path(Path::new("out/page-{n}.png"), 3, 5);
        assert_eq!(path, PathBuf::from("out/page-3.png"));

        let single = page_path(Path::new("out/page-{n}.png"), 1, 1);
        assert_eq!(single, PathBuf::from("out/page-1.png"));
    }

    #[test]
    fn test_page_path_without_placeholder() {
        assert_eq!(page_path(Path::new("doc.svg"), 1, 1), PathBuf::from("doc.svg"));
        assert_eq!(page_path(Path::new("doc.svg"), 2, 3), PathBuf::from("doc-2.svg"));
        assert_eq!(page_path(Path::new("dir/doc"), 1, 2), PathBuf::from("dir/doc-1"));
    }

    #[test]
    fn test_ppi_validation() {
        assert_eq!(pixel_per_pt(None).unwrap(), 2.0);
        assert_eq!(pixel_per_pt(Some(72.0)).unwrap(), 1.0);
        assert!(pixel_per_pt(Some(0.0)).is_err());
        assert!(pixel_per_pt(Some(f32::NAN)).is_err());
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_outcome_accessors() {
        let doc = CompileOutcome::Document(b"%PDF-".to_vec());
        assert_eq!(doc.as_document(), Some(&b"%PDF-"[..]));
        assert!(doc.as_pages().is_none());

        let pages = CompileOutcome::Pages(vec![b"<svg".to_vec()]);
        assert_eq!(pages.as_pages().map(|p| p.len()), Some(1));
        assert_eq!(pages.into_pages().unwrap().len(), 1);
    }
}
