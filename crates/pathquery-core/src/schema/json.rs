//! JSON Schema validation for JSON queries

use super::{SchemaError, SchemaLoader, SchemaValidator, ValidationOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Validates JSON input with the `jsonschema` crate
pub struct JsonSchemaValidator {
    loader: Arc<dyn SchemaLoader>,
}

impl JsonSchemaValidator {
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self { loader }
    }

    /// Validate against an already parsed schema document
    pub fn validate_with(
        schema: &Value,
        input: &str,
        reference: &str,
    ) -> Result<ValidationOutcome, SchemaError> {
        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Invalid {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;

        let instance: Value = match serde_json::from_str(input) {
            Ok(value) => value,
            Err(e) => {
                return Ok(ValidationOutcome::Invalid(vec![format!(
                    "Input is not valid JSON: {}",
                    e
                )]))
            }
        };

        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|e| {
                let location = e.instance_path.to_string();
                let location = if location.is_empty() { "/".to_string() } else { location };
                format!("{}: {}", location, e)
            })
            .collect();
        debug!("JSON schema check found {} violation(s)", violations.len());
        Ok(ValidationOutcome::from_violations(violations))
    }
}

#[async_trait]
impl SchemaValidator for JsonSchemaValidator {
    fn name(&self) -> &'static str {
        "json-schema"
    }

    async fn validate(
        &self,
        input: &str,
        reference: &str,
    ) -> Result<ValidationOutcome, SchemaError> {
        let document = self.loader.load(reference).await?;
        let schema: Value = serde_json::from_str(&document).map_err(|e| SchemaError::Invalid {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;
        Self::validate_with(&schema, input, reference)
    }
}
