//! Configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or checking configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A setting has a value that cannot be used
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Dotted name of the setting
        field: String,
        /// What was wrong with it
        value: String,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathQueryConfig {
    /// Schema documents for each input format
    pub schemas: SchemaConfig,
    /// Limits for schema retrieval
    pub network: NetworkConfig,
    /// Log output
    pub logging: LoggingConfig,
}

impl PathQueryConfig {
    /// Check every setting, reporting the first bad one
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schemas.validate()?;
        self.network.validate()?;
        self.logging.validate()
    }
}

/// Schema references: `http(s)://` URLs, `file://` URLs or plain paths
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SchemaConfig {
    /// XML Schema for XML queries
    pub xml: String,
    /// JSON Schema for JSON queries
    pub json: String,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            xml: "schemas/query.xsd".to_string(),
            json: "schemas/query.schema.json".to_string(),
        }
    }
}

impl SchemaConfig {
    /// Reference for a format name (`xml` or `json`, any case)
    pub fn reference_for(&self, format: &str) -> Option<&str> {
        match format.to_ascii_lowercase().as_str() {
            "xml" => Some(&self.xml),
            "json" => Some(&self.json),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("schemas.xml", &self.xml), ("schemas.json", &self.json)] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "schema reference must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Network settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Timeout for fetching a schema document
    pub timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl NetworkConfig {
    /// Timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "network.timeout_secs".to_string(),
                value: "timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level: off, error, warn, info, debug or trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: format!("unknown level '{}'", self.level),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PathQueryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.network.timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_reference_for() {
        let schemas = SchemaConfig::default();
        assert_eq!(schemas.reference_for("XML"), Some("schemas/query.xsd"));
        assert_eq!(schemas.reference_for("json"), Some("schemas/query.schema.json"));
        assert_eq!(schemas.reference_for("yaml"), None);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = PathQueryConfig::default();
        config.network.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "network.timeout_secs"
        ));

        let mut config = PathQueryConfig::default();
        config.schemas.json = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "schemas.json"
        ));

        let mut config = PathQueryConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
