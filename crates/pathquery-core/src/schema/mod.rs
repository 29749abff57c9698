//! Structural validation of raw query input against a schema document.
//!
//! Each input format has its own [`SchemaValidator`]. Validators fetch their
//! schema through a [`SchemaLoader`] on every call; nothing is cached here.
//! A failure to obtain or understand the schema is a [`SchemaError`], which
//! is a service-side problem, while problems with the input itself come back
//! as [`ValidationOutcome::Invalid`].

mod json;
mod loader;
mod xsd;

pub use json::JsonSchemaValidator;
pub use loader::{DefaultSchemaLoader, SchemaReference, StaticSchemaLoader};
pub use xsd::XmlSchemaValidator;

use async_trait::async_trait;
use thiserror::Error;

/// Errors obtaining or compiling a schema document
#[derive(Error, Debug)]
pub enum SchemaError {
    /// HTTP request for the schema failed
    #[error("Failed to fetch schema {reference}: {source}")]
    Fetch {
        reference: String,
        #[source]
        source: reqwest::Error,
    },

    /// Schema server answered with a non-success status
    #[error("Failed to fetch schema {reference}: HTTP status {status}")]
    Status { reference: String, status: u16 },

    /// Schema file could not be read
    #[error("Failed to read schema {reference}: {source}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    /// The document was retrieved but is not a usable schema
    #[error("Schema {reference} is not a valid schema document: {message}")]
    Invalid { reference: String, message: String },

    /// The reference uses a scheme no loader understands
    #[error("Unsupported schema reference: {0}")]
    UnsupportedReference(String),

    /// No schema registered under this reference
    #[error("No schema available for {0}")]
    NotFound(String),
}

/// Result of checking input against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// Violations in discovery order; never empty
    Invalid(Vec<String>),
}

impl ValidationOutcome {
    /// `Valid` when there are no violations
    pub fn from_violations(violations: Vec<String>) -> Self {
        if violations.is_empty() {
            ValidationOutcome::Valid
        } else {
            ValidationOutcome::Invalid(violations)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn violations(&self) -> &[String] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid(v) => v,
        }
    }
}

/// Retrieves schema documents by reference
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    async fn load(&self, reference: &str) -> Result<String, SchemaError>;
}

/// Checks raw input against the schema found at a reference
#[async_trait]
pub trait SchemaValidator: Send + Sync {
    /// Unique name for this validator
    fn name(&self) -> &'static str;

    async fn validate(
        &self,
        input: &str,
        reference: &str,
    ) -> Result<ValidationOutcome, SchemaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_violations() {
        assert!(ValidationOutcome::from_violations(vec![]).is_valid());
        let outcome = ValidationOutcome::from_violations(vec!["bad".to_string()]);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.violations(), &["bad".to_string()]);
    }
}
