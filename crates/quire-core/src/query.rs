//! Document queries
//!
//! A query evaluates a selector expression such as `heading` or `<note>`
//! against a laid out document, optionally projects one field of every
//! match and serializes the result as JSON or YAML.

use std::fmt;
use std::str::FromStr;

use comemo::Track;
use serde::{Deserialize, Serialize};
use tracing::debug;
use typst::eval::{eval_string, EvalMode};
use typst::foundations::{Content, IntoValue, LocatableSelector, Scope, Value};
use typst::model::Document;
use typst::syntax::Span;
use typst::World;

use crate::error::{Error, Result};

/// Format of serialized query output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializationFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for SerializationFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(SerializationFormat::Json),
            "yaml" => Ok(SerializationFormat::Yaml),
            other => Err(Error::config(format!(
                "unknown serialization format `{other}` (expected json or yaml)"
            ))),
        }
    }
}

impl fmt::Display for SerializationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationFormat::Json => write!(f, "json"),
            SerializationFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// What to query and how to present it
///
/// # Example
///
/// ```
/// use quire_core::query::{QueryOptions, SerializationFormat};
///
/// let options = QueryOptions::new("<note>")
///     .with_field("value")
///     .with_one(true)
///     .with_format(SerializationFormat::Yaml);
/// assert_eq!(options.field.as_deref(), Some("value"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Selector expression, evaluated as code
    pub selector: String,
    /// Field to extract from every match
    pub field: Option<String>,
    /// Require exactly one match and output it without a surrounding list
    pub one: bool,
    /// Output format
    pub format: SerializationFormat,
}

impl QueryOptions {
    /// Query all matches of `selector` as JSON
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            field: None,
            one: false,
            format: SerializationFormat::Json,
        }
    }

    /// Extract one field of every match
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Require exactly one match
    pub fn with_one(mut self, one: bool) -> Self {
        self.one = one;
        self
    }

    /// Set the output format
    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }
}

/// Find the elements of `document` matching `selector`
pub fn retrieve(world: &dyn World, selector: &str, document: &Document) -> Result<Vec<Content>> {
    let selector = eval_string(
        world.track(),
        selector,
        Span::detached(),
        EvalMode::Code,
        Scope::default(),
    )
    .map_err(|errors| {
        let message = errors
            .first()
            .map(|error| error.message.to_string())
            .unwrap_or_else(|| "invalid selector".to_string());
        Error::query(format!("cannot evaluate selector: {message}"))
    })?
    .cast::<LocatableSelector>()
    .map_err(|err| Error::query(format!("invalid selector: {err}")))?;

    let matches: Vec<Content> = document
        .introspector
        .query(&selector.0)
        .into_iter()
        .collect();
    debug!(matches = matches.len(), "evaluated selector");
    Ok(matches)
}

/// Project, check and serialize query matches
pub fn format(matches: Vec<Content>, options: &QueryOptions) -> Result<String> {
    if options.one && matches.len() != 1 {
        return Err(Error::query(format!(
            "expected exactly one element, found {}",
            matches.len()
        )));
    }

    let values = match &options.field {
        Some(field) => matches
            .into_iter()
            .map(|elem| {
                elem.get_by_name(field).ok_or_else(|| {
                    Error::config(format!(
                        "unknown field `{field}` on element `{}`",
                        elem.elem().name()
                    ))
                })
            })
            .collect::<Result<Vec<Value>>>()?,
        None => matches.into_iter().map(IntoValue::into_value).collect(),
    };

    match values.as_slice() {
        [value] if options.one => serialize(value, options.format),
        _ => serialize(&values, options.format),
    }
}

/// Serialize a value tree in the requested format
pub fn serialize(data: &impl Serialize, format: SerializationFormat) -> Result<String> {
    match format {
        SerializationFormat::Json => serde_json::to_string_pretty(data)
            .map_err(|err| Error::query(format!("failed to serialize to json: {err}"))),
        SerializationFormat::Yaml => serde_yaml::to_string(data)
            .map_err(|err| Error::query(format!("failed to serialize to yaml: {err}"))),
    }
}
