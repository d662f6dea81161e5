//! The engine's view of the file system
//!
//! [`SystemWorld`] implements the engine's `World` trait: it hands out the
//! standard library, fonts and source files, resolves package imports and
//! provides a clock that stays fixed for the duration of one compilation.
//!
//! Files are cached in slots keyed by file id. Between compilations the
//! slots are only marked stale; on next access a slot rereads the file and
//! keeps its parsed data when the content fingerprint did not change.

use std::collections::HashMap;
use std::fs;
use std::mem;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Datelike, Local, Timelike};
use codespan_reporting::files::{self, Error as CodespanError};
use comemo::Prehashed;
use tracing::debug;
use typst::diag::{FileError, FileResult, PackageResult};
use typst::foundations::{Bytes, Datetime, Dict};
use typst::syntax::package::PackageSpec;
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::{Library, World};

use crate::diagnostics::display_path;
use crate::error::{Error, Result};
use crate::fonts::FontCatalog;
use crate::package::PackageStorage;

/// Virtual path of in-memory main sources
const INLINE_PATH: &str = "<bytes>";

/// A world backed by the local file system
pub struct SystemWorld {
    /// Directory relative to which absolute imports are resolved
    root: PathBuf,
    /// The file compiled as the document
    main: FileId,
    /// Main source given as bytes rather than a path
    inline: Option<Source>,
    /// Reusable id for in-memory main sources
    inline_id: FileId,
    /// The standard library, including the current `sys.inputs`
    library: Prehashed<Library>,
    /// Discovered fonts
    fonts: Arc<FontCatalog>,
    /// Cached files, keyed by id
    slots: Mutex<HashMap<FileId, FileSlot>>,
    /// Package directories and downloads
    packages: PackageStorage,
    /// The current time, fixed on first use during a compilation
    now: OnceLock<DateTime<Local>>,
}

impl SystemWorld {
    /// Create a world whose main source is empty
    pub fn new(root: PathBuf, fonts: Arc<FontCatalog>, packages: PackageStorage) -> Self {
        let inline_id = FileId::new_fake(VirtualPath::new(INLINE_PATH));
        Self {
            root,
            main: inline_id,
            inline: Some(Source::new(inline_id, String::new())),
            inline_id,
            library: Prehashed::new(Library::default()),
            fonts,
            slots: Mutex::new(HashMap::new()),
            packages,
            now: OnceLock::new(),
        }
    }

    /// Use in-memory bytes as the main source
    ///
    /// A leading UTF-8 byte order mark is ignored.
    pub fn set_main_bytes(&mut self, root: PathBuf, bytes: &[u8]) -> Result<()> {
        let text = decode_utf8(bytes)
            .map_err(|_| Error::config("input is not valid UTF-8"))?;
        self.root = root;
        self.main = self.inline_id;
        self.inline = Some(Source::new(self.inline_id, text.to_string()));
        Ok(())
    }

    /// Use a file as the main source
    ///
    /// `path` must be canonical and lie inside `root`.
    pub fn set_main_path(&mut self, root: PathBuf, path: &Path) -> Result<()> {
        let vpath = VirtualPath::within_root(path, &root).ok_or_else(|| Error::Resolution {
            path: path.to_path_buf(),
            message: format!("file is not contained in project root {}", root.display()),
        })?;
        self.root = root;
        self.main = FileId::new(None, vpath);
        self.inline = None;
        Ok(())
    }

    /// Replace the values visible through `sys.inputs`
    pub fn set_inputs(&mut self, inputs: Dict) {
        self.library = Prehashed::new(Library::builder().with_inputs(inputs).build());
    }

    /// Prepare for the next compilation
    ///
    /// Marks every cached file as stale and unfreezes the clock.
    pub fn reset(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        for slot in slots.values_mut() {
            slot.reset();
        }
        self.now.take();
    }

    /// Load the main source, reporting missing files
    pub fn load_main(&self) -> Result<Source> {
        self.source(self.main).map_err(|err| {
            let path = self
                .main
                .vpath()
                .resolve(&self.root)
                .unwrap_or_else(|| self.main.vpath().as_rootless_path().to_path_buf());
            Error::Resolution {
                path,
                message: err.to_string(),
            }
        })
    }

    /// The project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The id of the main source
    pub fn main_id(&self) -> FileId {
        self.main
    }

    /// The current time in UTC, stable within one compilation
    pub fn now_utc(&self) -> Option<Datetime> {
        let now = self.now.get_or_init(Local::now).naive_utc();
        Datetime::from_ymd_hms(
            now.year(),
            now.month().try_into().ok()?,
            now.day().try_into().ok()?,
            now.hour().try_into().ok()?,
            now.minute().try_into().ok()?,
            now.second().try_into().ok()?,
        )
    }

    fn slot<F, T>(&self, id: FileId, f: F) -> T
    where
        F: FnOnce(&mut FileSlot) -> T,
    {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        f(slots.entry(id).or_insert_with(FileSlot::new))
    }

    /// Read a file from disk, resolving package files first
    fn read(&self, id: FileId) -> FileResult<Vec<u8>> {
        let package_root;
        let mut root = self.root.as_path();
        if let Some(spec) = id.package() {
            package_root = self.prepare_package(spec)?;
            root = &package_root;
        }

        // Paths escaping the root are denied. Symlinks are not checked.
        let path = id.vpath().resolve(root).ok_or(FileError::AccessDenied)?;
        read_from_disk(&path)
    }

    /// Locate a package, downloading it when needed
    fn prepare_package(&self, spec: &PackageSpec) -> PackageResult<PathBuf> {
        debug!(package = %spec, "resolving package");
        self.packages.prepare(spec)
    }
}

impl World for SystemWorld {
    fn library(&self) -> &Prehashed<Library> {
        &self.library
    }

    fn book(&self) -> &Prehashed<FontBook> {
        self.fonts.book()
    }

    fn main(&self) -> Source {
        self.source(self.main)
            .unwrap_or_else(|_| Source::new(self.main, String::new()))
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if let Some(inline) = self.inline.as_ref().filter(|source| source.id() == id) {
            return Ok(inline.clone());
        }
        self.slot(id, |slot| slot.source(id, || self.read(id)))
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        if let Some(inline) = self.inline.as_ref().filter(|source| source.id() == id) {
            return Ok(Bytes::from(inline.text().as_bytes()));
        }
        self.slot(id, |slot| slot.file(|| self.read(id)))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.font(index)
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let now = self.now.get_or_init(Local::now);
        let naive = match offset {
            None => now.naive_local(),
            Some(hours) => now.naive_utc() + chrono::Duration::hours(hours),
        };

        Datetime::from_ymd(
            naive.year(),
            naive.month().try_into().ok()?,
            naive.day().try_into().ok()?,
        )
    }
}

/// Source lookup for terminal rendering of diagnostics
impl<'a> files::Files<'a> for SystemWorld {
    type FileId = FileId;
    type Name = String;
    type Source = Source;

    fn name(&'a self, id: FileId) -> std::result::Result<String, CodespanError> {
        Ok(display_path(id))
    }

    fn source(&'a self, id: FileId) -> std::result::Result<Source, CodespanError> {
        World::source(self, id).map_err(|_| CodespanError::FileMissing)
    }

    fn line_index(&'a self, id: FileId, given: usize) -> std::result::Result<usize, CodespanError> {
        let source = files::Files::source(self, id)?;
        source.byte_to_line(given).ok_or_else(|| CodespanError::IndexTooLarge {
            given,
            max: source.len_bytes(),
        })
    }

    fn line_range(
        &'a self,
        id: FileId,
        given: usize,
    ) -> std::result::Result<Range<usize>, CodespanError> {
        let source = files::Files::source(self, id)?;
        source.line_to_range(given).ok_or_else(|| CodespanError::LineTooLarge {
            given,
            max: source.len_lines(),
        })
    }
}

/// Cached data for one file
///
/// A file may be both imported as source and read as bytes, so both views
/// are kept.
struct FileSlot {
    source: Revalidated<Source>,
    file: Revalidated<Bytes>,
}

impl FileSlot {
    fn new() -> Self {
        Self {
            source: Revalidated::new(),
            file: Revalidated::new(),
        }
    }

    fn reset(&mut self) {
        self.source.reset();
        self.file.reset();
    }

    fn source(
        &mut self,
        id: FileId,
        load: impl FnOnce() -> FileResult<Vec<u8>>,
    ) -> FileResult<Source> {
        self.source.get_or_init(load, |data, prev| {
            let text = decode_utf8(&data)?;
            match prev {
                // Incremental reparse of the previous version
                Some(mut prev) => {
                    prev.replace(text);
                    Ok(prev)
                }
                None => Ok(Source::new(id, text.into())),
            }
        })
    }

    fn file(&mut self, load: impl FnOnce() -> FileResult<Vec<u8>>) -> FileResult<Bytes> {
        self.file.get_or_init(load, |data, _| Ok(Bytes::from(data)))
    }
}

/// Processed file data that is revalidated once per compilation
struct Revalidated<T> {
    data: Option<FileResult<T>>,
    /// Hash of the raw contents, or of the read error
    fingerprint: u128,
    /// Whether the file was already checked in the current compilation
    accessed: bool,
}

impl<T: Clone> Revalidated<T> {
    fn new() -> Self {
        Self {
            data: None,
            fingerprint: 0,
            accessed: false,
        }
    }

    fn reset(&mut self) {
        self.accessed = false;
    }

    fn get_or_init(
        &mut self,
        load: impl FnOnce() -> FileResult<Vec<u8>>,
        process: impl FnOnce(Vec<u8>, Option<T>) -> FileResult<T>,
    ) -> FileResult<T> {
        if mem::replace(&mut self.accessed, true) {
            if let Some(data) = &self.data {
                return data.clone();
            }
        }

        let result = load();
        let fingerprint = typst::util::hash128(&result);
        if mem::replace(&mut self.fingerprint, fingerprint) == fingerprint {
            if let Some(data) = &self.data {
                return data.clone();
            }
        }

        let prev = self.data.take().and_then(|data| data.ok());
        let value = result.and_then(|data| process(data, prev));
        self.data = Some(value.clone());
        value
    }
}

fn read_from_disk(path: &Path) -> FileResult<Vec<u8>> {
    let to_file_error = |err| FileError::from_io(err, path);
    if fs::metadata(path).map_err(to_file_error)?.is_dir() {
        Err(FileError::IsDirectory)
    } else {
        fs::read(path).map_err(to_file_error)
    }
}

/// Decode UTF-8, skipping a byte order mark
fn decode_utf8(buf: &[u8]) -> FileResult<&str> {
    Ok(std::str::from_utf8(buf.strip_prefix(b"\xef\xbb\xbf").unwrap_or(buf))?)
}
