//! Query syntaxes.
//!
//! This module defines the `QuerySyntax` trait and `QuerySyntaxRegistry`.
//! A syntax turns input that already passed its schema check into a
//! [`PathQuery`] bound to a [`Model`]. The registry picks the syntax for an
//! input by priority: XML claims input starting with `<query`, JSON takes
//! everything else.

mod json;
mod xml;

pub use json::JsonSyntax;
pub use xml::{XmlSyntax, USERPROFILE_VERSION};

use crate::model::{Model, PathError};
use crate::query::{ConstraintError, PathQuery, SortDirection};
use crate::xml::XmlError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The two supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFormat {
    Xml,
    Json,
}

impl QueryFormat {
    /// Leading token that marks XML input
    pub const XML_MARKER: &'static str = "<query";

    pub fn detect(input: &str) -> Self {
        if input.starts_with(Self::XML_MARKER) {
            QueryFormat::Xml
        } else {
            QueryFormat::Json
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QueryFormat::Xml => "XML",
            QueryFormat::Json => "JSON",
        }
    }
}

impl fmt::Display for QueryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors turning input into a query
#[derive(Error, Debug)]
pub enum SyntaxError {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error("Invalid JSON query: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    #[error("Query version {found} is newer than the supported version {supported}")]
    UnsupportedVersion { found: String, supported: u32 },

    #[error("Query is for model {found}, but the data model is {expected}")]
    ModelMismatch { found: String, expected: String },

    #[error("{0}")]
    Structure(String),
}

/// Trait for query syntax parsers.
///
/// - `can_handle()` for fast detection
/// - `priority()` for ordering
/// - `parse()` for actual parsing
pub trait QuerySyntax: Send + Sync {
    /// Unique name for this syntax
    fn name(&self) -> &'static str;

    fn format(&self) -> QueryFormat;

    /// Fast check if this syntax might handle the input.
    fn can_handle(&self, input: &str) -> bool;

    /// Parse input into a query bound to `model`.
    ///
    /// Called only if `can_handle()` returned true.
    fn parse(&self, input: &str, model: &Model) -> Result<PathQuery, SyntaxError>;

    /// Priority (higher = tried first). Default: 50
    fn priority(&self) -> u8 {
        50
    }
}

/// Registry of syntax parsers (sorted by priority descending).
///
/// The first syntax where `can_handle()` returns true will be used.
pub struct QuerySyntaxRegistry {
    syntaxes: Vec<Arc<dyn QuerySyntax>>,
}

impl Default for QuerySyntaxRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl QuerySyntaxRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            syntaxes: Vec::new(),
        }
    }

    /// Registry with the XML and JSON syntaxes
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(XmlSyntax));
        registry.register(Arc::new(JsonSyntax));
        registry
    }

    /// Register a syntax (re-sorts by priority)
    pub fn register(&mut self, syntax: Arc<dyn QuerySyntax>) {
        self.syntaxes.push(syntax);
        self.syntaxes.sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    /// First syntax willing to handle the input
    pub fn detect(&self, input: &str) -> Option<&dyn QuerySyntax> {
        self.syntaxes
            .iter()
            .find(|s| s.can_handle(input))
            .map(|s| s.as_ref())
    }

    /// Get list of registered syntax names
    pub fn syntax_names(&self) -> Vec<&'static str> {
        self.syntaxes.iter().map(|s| s.name()).collect()
    }
}

/// Split `from` off paths that are written relative to the query root
pub(crate) fn qualify(root: Option<&str>, path: &str) -> String {
    let path = path.trim();
    match root {
        Some(root) if path != root && !path.starts_with(&format!("{}.", root)) => {
            format!("{}.{}", root, path)
        }
        _ => path.to_string(),
    }
}

/// `Gene.symbol asc Gene.length desc`: a direction applies to the path
/// before it, paths without one sort ascending
pub(crate) fn sort_pairs(text: &str) -> Vec<(&str, SortDirection)> {
    let mut pairs = Vec::new();
    let mut tokens = text.split_whitespace().peekable();
    while let Some(path) = tokens.next() {
        let direction = match tokens.peek().map(|next| next.parse::<SortDirection>()) {
            Some(Ok(direction)) => {
                tokens.next();
                direction
            }
            _ => SortDirection::Asc,
        };
        pairs.push((path, direction));
    }
    pairs
}
