//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use quire_core::config::CONFIG_FILE;
use quire_core::{
    CompileOptions, CompileOutcome, Diagnostic, Error, FontCatalog, Input, OutputFormat,
    QueryOptions, SerializationFormat, Session, Settings,
};
use quire_syntax::{parse, Expr};

/// Output format for listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ListingFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(author, version, about = "Compile, render and query Typst documents", long_about = None)]
struct Cli {
    /// Settings file (defaults to ./quire.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document to PDF, SVG, PNG or HTML
    Compile(CompileArgs),

    /// Query elements of a compiled document
    Query(QueryArgs),

    /// List available fonts
    Fonts(FontsArgs),

    /// Show the syntax tree of a document
    Parse(ParseArgs),
}

/// Arguments of `quire compile`
#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    /// Input file
    pub input: PathBuf,

    /// Output file; `{n}` is replaced by the page number for svg and png
    pub output: Option<PathBuf>,

    /// Output format (pdf, svg, png, html); inferred from the output file
    /// extension when omitted
    #[arg(short, long)]
    pub format: Option<String>,

    /// Pixels per inch for png output
    #[arg(long)]
    pub ppi: Option<f32>,

    #[command(flatten)]
    pub world: WorldArgs,
}

/// Arguments of `quire query`
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Input file
    pub input: PathBuf,

    /// Selector, e.g. `heading` or `<label>`
    pub selector: String,

    /// Extract this field from every match
    #[arg(long)]
    pub field: Option<String>,

    /// Expect exactly one match
    #[arg(long)]
    pub one: bool,

    /// Serialization format (json or yaml)
    #[arg(long, default_value = "json")]
    pub format: String,

    #[command(flatten)]
    pub world: WorldArgs,
}

/// Arguments of `quire fonts`
#[derive(Debug, Clone, Args)]
pub struct FontsArgs {
    /// List every face, not only the families
    #[arg(long)]
    pub variants: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ListingFormat,

    #[command(flatten)]
    pub fonts: FontArgs,
}

/// Arguments of `quire parse`
#[derive(Debug, Clone, Args)]
pub struct ParseArgs {
    /// Input file
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ListingFormat,
}

/// Arguments shared by commands that compile
#[derive(Debug, Clone, Default, Args)]
pub struct WorldArgs {
    /// Add a `sys.inputs` entry
    #[arg(long = "input", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub inputs: Vec<(String, String)>,

    /// Project root for absolute imports
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Directory containing local packages
    #[arg(long)]
    pub package_path: Option<PathBuf>,

    /// Never download missing packages
    #[arg(long)]
    pub offline: bool,

    #[command(flatten)]
    pub fonts: FontArgs,
}

/// Font discovery arguments
#[derive(Debug, Clone, Default, Args)]
pub struct FontArgs {
    /// Additional font file or directory
    #[arg(long = "font-path", value_name = "PATH")]
    pub font_paths: Vec<PathBuf>,

    /// Do not search system fonts
    #[arg(long)]
    pub ignore_system_fonts: bool,

    /// Do not use the fonts bundled with the engine
    #[arg(long)]
    pub ignore_embedded_fonts: bool,
}

/// Run the CLI application
///
/// Parses arguments, sets up logging and dispatches to the appropriate
/// command.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(args) => {
            for path in compile_command(&args, &settings)? {
                debug!(path = %path.display(), "written");
            }
        }
        Commands::Query(args) => {
            println!("{}", query_command(&args, &settings)?);
        }
        Commands::Fonts(args) => {
            print!("{}", fonts_command(&args, &settings)?);
        }
        Commands::Parse(args) => {
            print!("{}", parse_command(&args.input, args.format)?);
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Load settings from `path`, or from `quire.toml` in the working directory
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings: {}", path.display())),
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.is_file() {
                Settings::load(default).context("Failed to load quire.toml")
            } else {
                Ok(Settings::default())
            }
        }
    }
}

/// Execute the compile command, returning the written files
pub fn compile_command(args: &CompileArgs, settings: &Settings) -> Result<Vec<PathBuf>> {
    let format = resolve_format(args, settings)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension(format.extension()));
    let ppi = args.ppi.or(settings.compile.ppi);

    let mut session = build_session(&args.input, &args.world, settings)?;
    let mut options = CompileOptions::new(format).with_output(&output);
    options.ppi = ppi;

    let written = match compile_reporting(&mut session, options)? {
        CompileOutcome::Written(paths) => paths,
        _ => Vec::new(),
    };
    debug!(%format, files = written.len(), "compile command finished");
    Ok(written)
}

/// Execute the query command, returning the serialized matches
pub fn query_command(args: &QueryArgs, settings: &Settings) -> Result<String> {
    let format: SerializationFormat = args.format.parse()?;
    let mut options = QueryOptions::new(&args.selector)
        .with_one(args.one)
        .with_format(format);
    if let Some(field) = &args.field {
        options = options.with_field(field);
    }

    let mut session = build_session(&args.input, &args.world, settings)?;
    match session.query(&options) {
        Ok(output) => Ok(output),
        Err(Error::Compile(err)) => {
            report(&session, &err.warnings);
            report(&session, &err.diagnostics);
            Err(Error::Compile(err).into())
        }
        Err(err) => Err(err).with_context(|| format!("Query failed: {}", args.selector)),
    }
}

/// Execute the fonts command, returning the listing
pub fn fonts_command(args: &FontsArgs, settings: &Settings) -> Result<String> {
    let catalog = FontCatalog::new(&font_options(&args.fonts, settings));

    if args.format == ListingFormat::Json {
        let json = if args.variants {
            serde_json::to_string_pretty(&catalog.fonts())
        } else {
            serde_json::to_string_pretty(catalog.families())
        }
        .context("Failed to serialize fonts to JSON")?;
        return Ok(format!("{json}\n"));
    }

    let fonts = catalog.fonts();
    let mut out = String::new();
    for family in catalog.families() {
        out.push_str(family);
        out.push('\n');
        if args.variants {
            for font in fonts.iter().filter(|font| &font.family == family) {
                out.push_str(&format!(
                    "- style: {}, weight: {}, stretch: {}",
                    font.style, font.weight, font.stretch
                ));
                if let Some(path) = &font.path {
                    out.push_str(&format!(", path: {}", path.display()));
                }
                out.push('\n');
            }
        }
    }
    Ok(out)
}

/// Execute the parse command, returning the outline of the syntax tree
pub fn parse_command(input: &Path, format: ListingFormat) -> Result<String> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    let markup = parse(&text);
    let exprs: Vec<Expr> = markup.exprs().collect();
    let errors = markup.to_untyped().errors();

    if format == ListingFormat::Json {
        let exprs: Vec<serde_json::Value> = exprs
            .iter()
            .map(|expr| {
                let range = expr.span().range().unwrap_or(0..0);
                serde_json::json!({
                    "variant": expr.variant(),
                    "kind": expr.kind().name(),
                    "start": range.start,
                    "end": range.end,
                    "text": expr.text(),
                })
            })
            .collect();
        let errors: Vec<serde_json::Value> = errors
            .iter()
            .map(|error| {
                serde_json::json!({
                    "message": error.message,
                    "hints": error.hints,
                    "range": error.span.range().map(|r| [r.start, r.end]),
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "exprs": exprs,
            "errors": errors,
        }))
        .context("Failed to serialize syntax tree to JSON")?;
        return Ok(format!("{json}\n"));
    }

    let mut out = String::new();
    for expr in &exprs {
        let range = expr.span().range().unwrap_or(0..0);
        out.push_str(&format!(
            "{:<16} {}..{}  {}\n",
            expr.variant(),
            range.start,
            range.end,
            preview(&expr.text())
        ));
    }
    for error in &errors {
        out.push_str(&format!("error: {}", error.message));
        if let Some(range) = error.span.range() {
            out.push_str(&format!(" ({}..{})", range.start, range.end));
        }
        out.push('\n');
        for hint in &error.hints {
            out.push_str(&format!("  = hint: {hint}\n"));
        }
    }
    Ok(out)
}

fn resolve_format(args: &CompileArgs, settings: &Settings) -> Result<OutputFormat> {
    if let Some(format) = &args.format {
        return Ok(format.parse()?);
    }
    let from_extension = args
        .output
        .as_ref()
        .and_then(|output| output.extension())
        .and_then(|ext| ext.to_str())
        .and_then(|ext| ext.parse().ok());
    match from_extension {
        Some(format) => Ok(format),
        None => Ok(settings.format()?),
    }
}

fn build_session(input: &Path, world: &WorldArgs, settings: &Settings) -> Result<Session> {
    let mut inputs = settings.inputs.clone();
    inputs.extend(world.inputs.iter().cloned());

    let mut builder = settings
        .session_builder()
        .with_input(Input::path(input))
        .with_sys_inputs(inputs)
        .with_font_options(font_options(&world.fonts, settings));
    if let Some(root) = &world.root {
        builder = builder.with_root(root);
    }
    if let Some(path) = &world.package_path {
        builder = builder.with_package_path(path);
    }
    if world.offline {
        builder = builder.with_package_downloads(false);
    }

    builder
        .build()
        .with_context(|| format!("Failed to open {}", input.display()))
}

fn font_options(args: &FontArgs, settings: &Settings) -> quire_core::FontOptions {
    let mut options = settings.font_options();
    options.font_paths.extend(args.font_paths.iter().cloned());
    if args.ignore_system_fonts {
        options.include_system_fonts = false;
    }
    if args.ignore_embedded_fonts {
        options.include_embedded_fonts = false;
    }
    options
}

/// Compile and print diagnostics to stderr
fn compile_reporting(session: &mut Session, options: CompileOptions) -> Result<CompileOutcome> {
    match session.compile_with_warnings(options) {
        Ok((outcome, warnings)) => {
            report(session, &warnings);
            Ok(outcome)
        }
        Err(Error::Compile(err)) => {
            report(session, &err.warnings);
            report(session, &err.diagnostics);
            Err(Error::Compile(err).into())
        }
        Err(err) => Err(err.into()),
    }
}

fn report(session: &Session, diagnostics: &[Diagnostic]) {
    if !diagnostics.is_empty() {
        eprint!("{}", session.render_diagnostics(diagnostics));
    }
}

/// Parse a `key=value` argument
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

/// First line of `text`, shortened for listings
fn preview(text: &str) -> String {
    const MAX: usize = 40;
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > MAX {
        let short: String = line.chars().take(MAX).collect();
        format!("{short}...")
    } else {
        line.to_string()
    }
}
