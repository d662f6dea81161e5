//! Compilation sessions
//!
//! A [`Session`] holds the state shared by a series of compilations: the
//! stored source, the resolved `sys.inputs`, the font catalog and the file
//! cache. Each compile call may override the source for that call only and
//! may change the inputs, which then stay in effect for later calls.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use typst::eval::Tracer;
use typst::foundations::{Dict, IntoValue, Str};
use typst::model::Document;

use crate::diagnostics::{self, translate, Diagnostic};
use crate::error::{CompileError, Error, Result};
use crate::fonts::{FontCatalog, FontOptions};
use crate::output::{self, CompileOutcome, OutputFormat};
use crate::package::PackageStorage;
use crate::query::{self, QueryOptions};
use crate::world::SystemWorld;

/// Maximum age of memoized engine results kept between compilations
const CACHE_MAX_AGE: usize = 10;

/// Source of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// UTF-8 markup held in memory
    Bytes(Vec<u8>),
    /// A file on disk
    Path(PathBuf),
}

impl Input {
    /// Markup held in memory
    pub fn text(text: impl Into<String>) -> Self {
        Input::Bytes(text.into().into_bytes())
    }

    /// A file on disk
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Input::Path(path.into())
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::Path(path)
    }
}

impl From<Vec<u8>> for Input {
    fn from(bytes: Vec<u8>) -> Self {
        Input::Bytes(bytes)
    }
}

/// Update to the values visible through `sys.inputs`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SysInputs {
    /// Keep whatever was last set
    #[default]
    Unspecified,
    /// Remove all inputs
    Cleared,
    /// Replace all inputs with this map
    Replaced(BTreeMap<String, String>),
}

impl SysInputs {
    /// Replace all inputs with the given pairs
    pub fn replaced<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        SysInputs::Replaced(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Options for one compile call
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Source for this call only, instead of the stored one
    pub input: Option<Input>,
    /// Output format
    pub format: OutputFormat,
    /// Write the output here instead of returning it
    pub output: Option<PathBuf>,
    /// Pixels per inch, used for `png` only
    pub ppi: Option<f32>,
    /// Change to `sys.inputs`, kept for later calls
    pub sys_inputs: SysInputs,
}

impl CompileOptions {
    /// Compile the stored source to `format`
    pub fn new(format: OutputFormat) -> Self {
        Self {
            input: None,
            format,
            output: None,
            ppi: None,
            sys_inputs: SysInputs::Unspecified,
        }
    }

    /// Compile this source instead of the stored one
    pub fn with_input(mut self, input: impl Into<Input>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Write the output to a file
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    /// Set the PNG resolution
    pub fn with_ppi(mut self, ppi: f32) -> Self {
        self.ppi = Some(ppi);
        self
    }

    /// Change `sys.inputs`
    pub fn with_sys_inputs(mut self, sys_inputs: SysInputs) -> Self {
        self.sys_inputs = sys_inputs;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new(OutputFormat::Pdf)
    }
}

/// Builder for [`Session`]
///
/// # Example
///
/// ```no_run
/// use quire_core::{FontOptions, Input, SessionBuilder};
///
/// let session = SessionBuilder::new()
///     .with_input(Input::path("report.typ"))
///     .with_font_options(FontOptions::embedded_only())
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    input: Option<Input>,
    sys_inputs: BTreeMap<String, String>,
    font_options: FontOptions,
    fonts: Option<Arc<FontCatalog>>,
    root: Option<PathBuf>,
    package_path: Option<PathBuf>,
    offline: bool,
    packages: Option<PackageStorage>,
}

impl SessionBuilder {
    /// Start with an empty source and default fonts
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stored source
    pub fn with_input(mut self, input: impl Into<Input>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Set the initial `sys.inputs`
    pub fn with_sys_inputs(mut self, inputs: BTreeMap<String, String>) -> Self {
        self.sys_inputs = inputs;
        self
    }

    /// Configure font discovery
    pub fn with_font_options(mut self, options: FontOptions) -> Self {
        self.font_options = options;
        self
    }

    /// Use an existing font catalog instead of discovering fonts
    pub fn with_fonts(mut self, fonts: Arc<FontCatalog>) -> Self {
        self.fonts = Some(fonts);
        self
    }

    /// Set the project root
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the local package directory, searched before the platform ones
    pub fn with_package_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.package_path = Some(path.into());
        self
    }

    /// Allow or forbid downloading missing `@preview` packages
    pub fn with_package_downloads(mut self, enabled: bool) -> Self {
        self.offline = !enabled;
        self
    }

    /// Use fully configured package storage, overriding the package path
    /// and download settings
    pub fn with_package_storage(mut self, storage: PackageStorage) -> Self {
        self.packages = Some(storage);
        self
    }

    /// Create the session
    ///
    /// Path sources and the root are canonicalized here, so a missing file
    /// is reported now as a configuration error.
    pub fn build(self) -> Result<Session> {
        let root = self
            .root
            .map(|root| {
                root.canonicalize().map_err(|err| {
                    Error::config(format!("cannot resolve root {}: {err}", root.display()))
                })
            })
            .transpose()?;

        let input = match self.input {
            Some(Input::Path(path)) => {
                let canonical = path.canonicalize().map_err(|err| {
                    Error::config(format!("cannot resolve input {}: {err}", path.display()))
                })?;
                if let Some(root) = &root {
                    if !canonical.starts_with(root) {
                        return Err(Error::config(format!(
                            "input {} is outside the project root {}",
                            canonical.display(),
                            root.display()
                        )));
                    }
                }
                Some(Input::Path(canonical))
            }
            other => other,
        };

        let fonts = self
            .fonts
            .unwrap_or_else(|| Arc::new(FontCatalog::new(&self.font_options)));

        let initial_root = match &root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        let packages = self.packages.unwrap_or_else(|| {
            PackageStorage::new(self.package_path).with_downloads(!self.offline)
        });
        let mut world = SystemWorld::new(initial_root, fonts, packages);
        world.set_inputs(to_dict(&self.sys_inputs));

        info!(
            input = ?input.as_ref().map(describe),
            inputs = self.sys_inputs.len(),
            "session created"
        );

        Ok(Session {
            input,
            root,
            inputs: self.sys_inputs,
            world,
            document: None,
        })
    }
}

/// A stateful compilation context
pub struct Session {
    /// The stored source, paths already canonical
    input: Option<Input>,
    /// Explicit project root
    root: Option<PathBuf>,
    /// The resolved `sys.inputs`
    inputs: BTreeMap<String, String>,
    world: SystemWorld,
    /// Last document compiled from the stored source
    document: Option<Document>,
}

impl Session {
    /// A session with an empty source and default fonts
    pub fn new() -> Result<Self> {
        SessionBuilder::new().build()
    }

    /// Start configuring a session
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The resolved `sys.inputs`
    pub fn sys_inputs(&self) -> &BTreeMap<String, String> {
        &self.inputs
    }

    /// The stored source
    pub fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }

    /// Compile a document
    pub fn compile(&mut self, options: CompileOptions) -> Result<CompileOutcome> {
        self.compile_with_warnings(options).map(|(outcome, _)| outcome)
    }

    /// Compile a document and return the warnings the engine reported
    pub fn compile_with_warnings(
        &mut self,
        options: CompileOptions,
    ) -> Result<(CompileOutcome, Vec<Diagnostic>)> {
        self.apply_sys_inputs(options.sys_inputs);

        let override_input = match options.input {
            Some(Input::Path(path)) => Some(Input::Path(canonicalize(&path)?)),
            other => other,
        };
        let stored = override_input.is_none();
        let input = override_input.or_else(|| self.input.clone());

        let compiled = self.compile_document(input.as_ref());
        if stored && compiled.is_err() {
            self.document = None;
        }
        let (document, warnings) = compiled?;

        let ppi = match options.format {
            OutputFormat::Png => options.ppi,
            _ => None,
        };
        let outcome = output::export(&document, options.format, ppi, self.world.now_utc())?;
        let outcome = match &options.output {
            Some(path) => output::write(outcome, path)?,
            None => outcome,
        };

        if stored {
            self.document = Some(document);
        }
        Ok((outcome, warnings))
    }

    /// Render diagnostics from this session's last compilation as text
    ///
    /// Each diagnostic shows the source lines it points at, followed by its
    /// hints and trace.
    pub fn render_diagnostics(&self, diagnostics: &[Diagnostic]) -> String {
        diagnostics::render(&self.world, diagnostics)
    }

    /// Query the document compiled from the stored source
    ///
    /// Compiles the stored source first when no compiled document is cached
    /// or the inputs changed since.
    pub fn query(&mut self, options: &QueryOptions) -> Result<String> {
        let document = match self.document.take() {
            Some(document) => document,
            None => {
                let input = self.input.clone();
                self.compile_document(input.as_ref())?.0
            }
        };

        let matches = query::retrieve(&self.world, &options.selector, &document);
        self.document = Some(document);
        query::format(matches?, options)
    }

    /// Apply a change to `sys.inputs`
    fn apply_sys_inputs(&mut self, update: SysInputs) {
        let inputs = match update {
            SysInputs::Unspecified => return,
            SysInputs::Cleared => BTreeMap::new(),
            SysInputs::Replaced(inputs) => inputs,
        };
        if inputs == self.inputs {
            return;
        }

        debug!(inputs = inputs.len(), "updating sys inputs");
        self.world.set_inputs(to_dict(&inputs));
        self.inputs = inputs;
        self.document = None;
    }

    /// Run the engine on `input`, or on an empty source
    fn compile_document(&mut self, input: Option<&Input>) -> Result<(Document, Vec<Diagnostic>)> {
        self.world.reset();
        match input {
            Some(Input::Path(path)) => {
                let root = match &self.root {
                    Some(root) => root.clone(),
                    None => path
                        .parent()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| PathBuf::from("/")),
                };
                self.world.set_main_path(root, path)?;
            }
            Some(Input::Bytes(bytes)) => {
                let root = self.default_root()?;
                self.world.set_main_bytes(root, bytes)?;
            }
            None => {
                let root = self.default_root()?;
                self.world.set_main_bytes(root, b"")?;
            }
        }
        self.world.load_main()?;

        info!(main = ?self.world.main_id(), root = %self.world.root().display(), "compiling");
        let mut tracer = Tracer::new();
        let result = typst::compile(&self.world, &mut tracer);
        comemo::evict(CACHE_MAX_AGE);

        let warnings = translate(&self.world, &tracer.warnings());
        for warning in &warnings {
            warn!("{warning}");
        }

        match result {
            Ok(document) => {
                debug!(pages = document.pages.len(), "compilation finished");
                Ok((document, warnings))
            }
            Err(errors) => {
                let diagnostics = translate(&self.world, &errors);
                debug!(errors = diagnostics.len(), "compilation failed");
                Err(CompileError {
                    diagnostics,
                    warnings,
                }
                .into())
            }
        }
    }

    fn default_root(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|err| Error::Resolution {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn to_dict(inputs: &BTreeMap<String, String>) -> Dict {
    inputs
        .iter()
        .map(|(key, value)| (Str::from(key.as_str()), Str::from(value.as_str()).into_value()))
        .collect()
}

fn describe(input: &Input) -> String {
    match input {
        Input::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        Input::Path(path) => path.display().to_string(),
    }
}
