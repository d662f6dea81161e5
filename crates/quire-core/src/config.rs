//! Configuration file
//!
//! Settings are loaded from `quire.toml`:
//!
//! ```toml
//! [compile]
//! format = "svg"
//! ppi = 300.0
//! root = "docs/"
//!
//! [fonts]
//! include_system_fonts = false
//! paths = ["fonts/"]
//!
//! [inputs]
//! version = "1.2"
//!
//! [packages]
//! path = "vendor/packages"
//! download = false
//! ```
//!
//! Every section and field is optional.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fonts::FontOptions;
use crate::output::OutputFormat;
use crate::session::SessionBuilder;

/// Default name of the configuration file
pub const CONFIG_FILE: &str = "quire.toml";

/// Top-level settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Compile defaults
    pub compile: CompileSettings,
    /// Font discovery
    pub fonts: FontSettings,
    /// Initial `sys.inputs`
    pub inputs: BTreeMap<String, String>,
    /// Package resolution
    pub packages: PackageSettings,
}

/// Compile defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileSettings {
    /// Output format name, validated on use
    pub format: String,
    /// PNG resolution
    pub ppi: Option<f32>,
    /// Project root
    pub root: Option<PathBuf>,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Pdf.to_string(),
            ppi: None,
            root: None,
        }
    }
}

/// Font discovery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub include_system_fonts: bool,
    pub include_embedded_fonts: bool,
    /// Extra font files or directories
    pub paths: Vec<PathBuf>,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            include_system_fonts: true,
            include_embedded_fonts: true,
            paths: Vec::new(),
        }
    }
}

/// Package settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    /// Directory holding `<namespace>/<name>/<version>` package trees
    pub path: Option<PathBuf>,
    /// Download missing `@preview` packages
    pub download: bool,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            path: None,
            download: true,
        }
    }
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| Error::config(format!("invalid settings: {err}")))
    }

    /// Load settings from a file
    ///
    /// Relative paths in the file are resolved against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            Error::config(format!("cannot read settings {}: {err}", path.display()))
        })?;
        let mut settings = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            settings.relative_to(base);
        }
        Ok(settings)
    }

    /// The configured output format
    pub fn format(&self) -> Result<OutputFormat> {
        self.compile.format.parse()
    }

    /// Font discovery options
    pub fn font_options(&self) -> FontOptions {
        FontOptions {
            include_system_fonts: self.fonts.include_system_fonts,
            include_embedded_fonts: self.fonts.include_embedded_fonts,
            font_paths: self.fonts.paths.clone(),
        }
    }

    /// A session builder carrying these settings
    pub fn session_builder(&self) -> SessionBuilder {
        let mut builder = SessionBuilder::new()
            .with_font_options(self.font_options())
            .with_sys_inputs(self.inputs.clone())
            .with_package_downloads(self.packages.download);
        if let Some(root) = &self.compile.root {
            builder = builder.with_root(root);
        }
        if let Some(path) = &self.packages.path {
            builder = builder.with_package_path(path);
        }
        builder
    }

    fn relative_to(&mut self, base: &Path) {
        let rebase = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        if let Some(root) = self.compile.root.as_mut() {
            rebase(root);
        }
        if let Some(path) = self.packages.path.as_mut() {
            rebase(path);
        }
        self.fonts.paths.iter_mut().for_each(rebase);
    }
}
