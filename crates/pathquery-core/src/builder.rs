//! Query building: schema check, deserialisation, verification and the bag
//! check, in that order. The first failing stage ends the build with all of
//! that stage's problems in one [`BuildError`].

use crate::bags::{check_bags, BagProducer};
use crate::error::BuildError;
use crate::model::Model;
use crate::query::PathQuery;
use crate::schema::{
    DefaultSchemaLoader, JsonSchemaValidator, SchemaLoader, SchemaValidator, ValidationOutcome,
    XmlSchemaValidator,
};
use crate::syntax::{QueryFormat, QuerySyntaxRegistry};
use crate::verify::verify_query;
use std::sync::Arc;
use tracing::{debug, info};

/// Builds [`PathQuery`] values from XML or JSON input.
///
/// Holds no per-call state, so one builder can serve concurrent builds.
pub struct PathQueryBuilder {
    syntaxes: QuerySyntaxRegistry,
    xml_validator: Arc<dyn SchemaValidator>,
    json_validator: Arc<dyn SchemaValidator>,
}

impl Default for PathQueryBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultSchemaLoader::default()))
    }
}

impl PathQueryBuilder {
    /// Builder whose validators fetch schemas through `loader`
    pub fn new(loader: Arc<dyn SchemaLoader>) -> Self {
        Self::with_validators(
            Arc::new(XmlSchemaValidator::new(loader.clone())),
            Arc::new(JsonSchemaValidator::new(loader)),
        )
    }

    pub fn with_validators(
        xml_validator: Arc<dyn SchemaValidator>,
        json_validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        Self {
            syntaxes: QuerySyntaxRegistry::standard(),
            xml_validator,
            json_validator,
        }
    }

    /// Build and validate a query.
    ///
    /// `bags` is only consulted when the query refers to at least one bag.
    pub async fn build(
        &self,
        input: &str,
        model: &Model,
        schema_reference: &str,
        bags: BagProducer<'_>,
    ) -> Result<PathQuery, BuildError> {
        let syntax = self.syntaxes.detect(input).ok_or_else(|| {
            BuildError::internal("No query syntax is registered for this input")
        })?;
        let format = syntax.format();
        debug!("Building {} query with the {} syntax", format, syntax.name());

        let validator = match format {
            QueryFormat::Xml => &self.xml_validator,
            QueryFormat::Json => &self.json_validator,
        };
        let outcome = validator
            .validate(input, schema_reference)
            .await
            .map_err(BuildError::internal)?;
        if let ValidationOutcome::Invalid(violations) = outcome {
            debug!("Received invalid {}: {}", format, input);
            let message = match format {
                QueryFormat::Xml => {
                    format!("Query does not pass XML validation. {}", format_message(&violations))
                }
                QueryFormat::Json => format_message(&violations),
            };
            return Err(BuildError::Malformed { message });
        }

        let query = syntax.parse(input, model).map_err(|e| {
            debug!("Could not deserialise {} query: {}", format, e);
            match format {
                QueryFormat::Xml => BuildError::Malformed {
                    message: format!("XML is not well formatted. Got {}.", input),
                },
                QueryFormat::Json => BuildError::internal(format!("Could not bind JSON query: {}", e)),
            }
        })?;

        let problems = verify_query(&query, model);
        if !problems.is_empty() {
            return Err(BuildError::InvalidQuery {
                message: format!(
                    "{} is well formatted but query contains errors:\n{}",
                    format,
                    format_message(&problems)
                ),
            });
        }

        let check = check_bags(&query, &bags).map_err(BuildError::internal)?;
        if !check.missing.is_empty() {
            let names: Vec<String> = check.missing.iter().cloned().collect();
            return Err(BuildError::MissingBags {
                message: format!(
                    "The query is well formatted but you do not have access to the following mentioned lists:\n{}",
                    format_message(&names)
                ),
                names: check.missing,
            });
        }
        if !check.stale.is_empty() {
            let names: Vec<String> = check.stale.iter().cloned().collect();
            return Err(BuildError::StaleBags {
                message: format!(
                    "The query is well formatted, but the following lists are not 'current', and need to be manually upgraded:\n{}",
                    format_message(&names)
                ),
                names: check.stale,
            });
        }

        info!(
            "Built {} query over {} with {} view path(s)",
            format,
            query.root_class().unwrap_or("?"),
            query.view().len()
        );
        Ok(query)
    }
}

/// One line per message, each ending in a full stop
pub fn format_message<S: AsRef<str>>(messages: &[S]) -> String {
    let mut out = String::new();
    for message in messages {
        let message = message.as_ref();
        out.push_str(message);
        if !message.ends_with('.') {
            out.push('.');
        }
        out.push('\n');
    }
    out
}
