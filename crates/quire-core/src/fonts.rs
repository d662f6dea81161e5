//! Font discovery
//!
//! A [`FontCatalog`] collects font faces from user supplied paths, the
//! operating system and the fonts bundled with the engine. It builds the
//! engine's font book eagerly but only loads font data when a face is
//! actually used.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use comemo::Prehashed;
use fontdb::{Database, Source};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use typst::foundations::Bytes;
use typst::text::{Font, FontBook, FontInfo as EngineFontInfo, FontStyle};

/// Description of one discovered font face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    /// Family name, e.g. "Linux Libertine"
    pub family: String,

    /// `normal`, `italic` or `oblique`
    pub style: String,

    /// Weight from 100 (thin) to 900 (black)
    pub weight: u16,

    /// Width relative to normal, e.g. 0.5 for ultra condensed
    pub stretch: f64,

    /// The file the face was read from, `None` for embedded fonts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Index of the face within its file
    pub index: u32,
}

/// Options controlling where fonts are searched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontOptions {
    /// Search the fonts installed on the system
    pub include_system_fonts: bool,

    /// Include the fonts bundled with the engine
    pub include_embedded_fonts: bool,

    /// Extra font files or directories, searched first
    pub font_paths: Vec<PathBuf>,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            include_system_fonts: true,
            include_embedded_fonts: true,
            font_paths: Vec::new(),
        }
    }
}

impl FontOptions {
    /// Only the bundled fonts, independent of the host system
    pub fn embedded_only() -> Self {
        Self {
            include_system_fonts: false,
            ..Self::default()
        }
    }

    /// Add a font file or directory
    pub fn with_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_paths.push(path.into());
        self
    }

    /// Set whether system fonts are searched
    pub fn with_system_fonts(mut self, include: bool) -> Self {
        self.include_system_fonts = include;
        self
    }

    /// Set whether bundled fonts are included
    pub fn with_embedded_fonts(mut self, include: bool) -> Self {
        self.include_embedded_fonts = include;
        self
    }
}

/// A lazily loaded font face
#[derive(Debug)]
struct FontSlot {
    /// Path to the font file, `None` for embedded fonts
    path: Option<PathBuf>,
    /// Face index within the file
    index: u32,
    /// The loaded font, filled on first use
    font: OnceLock<Option<Font>>,
}

impl FontSlot {
    fn get(&self) -> Option<Font> {
        self.font
            .get_or_init(|| {
                let path = self.path.as_ref()?;
                let data = fs::read(path)
                    .map_err(|err| warn!(path = %path.display(), %err, "failed to load font"))
                    .ok()?;
                Font::new(Bytes::from(data), self.index)
            })
            .clone()
    }
}

/// All fonts known to a session
///
/// The catalog is immutable once built and can be shared between sessions
/// through an `Arc`.
#[derive(Debug)]
pub struct FontCatalog {
    book: Prehashed<FontBook>,
    slots: Vec<FontSlot>,
    families: OnceLock<Vec<String>>,
}

impl FontCatalog {
    /// Discover fonts according to `options`
    ///
    /// Never fails: paths that cannot be read are skipped with a warning.
    pub fn new(options: &FontOptions) -> Self {
        let mut book = FontBook::new();
        let mut slots = Vec::new();

        let mut db = Database::new();
        for path in &options.font_paths {
            load_path(&mut db, path);
        }
        if options.include_system_fonts {
            db.load_system_fonts();
        }

        for face in db.faces() {
            let path = match &face.source {
                Source::File(path) | Source::SharedFile(path, _) => path,
                Source::Binary(_) => continue,
            };

            let info = db
                .with_face_data(face.id, EngineFontInfo::new)
                .flatten();
            if let Some(info) = info {
                book.push(info);
                slots.push(FontSlot {
                    path: Some(path.clone()),
                    index: face.index,
                    font: OnceLock::new(),
                });
            }
        }

        if options.include_embedded_fonts {
            for data in typst_assets::fonts() {
                for font in Font::iter(Bytes::from_static(data)) {
                    book.push(font.info().clone());
                    slots.push(FontSlot {
                        path: None,
                        index: font.index(),
                        font: OnceLock::from(Some(font)),
                    });
                }
            }
        }

        debug!(
            faces = slots.len(),
            system = options.include_system_fonts,
            embedded = options.include_embedded_fonts,
            "font discovery finished"
        );

        Self {
            book: Prehashed::new(book),
            slots,
            families: OnceLock::new(),
        }
    }

    /// The engine's font book
    pub fn book(&self) -> &Prehashed<FontBook> {
        &self.book
    }

    /// Load the face with the given book index
    pub fn font(&self, index: usize) -> Option<Font> {
        self.slots.get(index)?.get()
    }

    /// Number of discovered faces
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no faces were found
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Distinct family names in font book order
    pub fn families(&self) -> &[String] {
        self.families.get_or_init(|| {
            self.book
                .families()
                .map(|(family, _)| family.to_string())
                .collect()
        })
    }

    /// Every discovered face, in discovery order
    pub fn fonts(&self) -> Vec<FontInfo> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let info = self.book.info(i)?;
                Some(FontInfo {
                    family: info.family.clone(),
                    style: style_name(info.variant.style).to_string(),
                    weight: info.variant.weight.to_number(),
                    stretch: info.variant.stretch.to_ratio().get(),
                    path: slot.path.clone(),
                    index: slot.index,
                })
            })
            .collect()
    }
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new(&FontOptions::default())
    }
}

fn load_path(db: &mut Database, path: &Path) {
    if path.is_dir() {
        db.load_fonts_dir(path);
    } else if path.is_file() {
        if let Err(err) = db.load_font_file(path) {
            warn!(path = %path.display(), %err, "skipping unreadable font file");
        }
    } else {
        warn!(path = %path.display(), "skipping missing font path");
    }
}

fn style_name(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Normal => "normal",
        FontStyle::Italic => "italic",
        FontStyle::Oblique => "oblique",
    }
}
