//! Loading configuration from files

use crate::{ConfigError, PathQueryConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Guess the format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

/// Reads [`PathQueryConfig`] from TOML or JSON
pub struct ConfigLoader;

impl ConfigLoader {
    /// `~/.config/pathquery/config.toml` (platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pathquery").join("config.toml"))
    }

    /// Parse and validate configuration text
    pub fn from_str(content: &str, format: ConfigFormat) -> Result<PathQueryConfig, ConfigError> {
        let config: PathQueryConfig = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, choosing the format by extension
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<PathQueryConfig, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_str(&content, ConfigFormat::from_path(path))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else
    /// built-in defaults. An explicit path that cannot be read is an error.
    pub async fn load_or_default(path: Option<PathBuf>) -> Result<PathQueryConfig, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }
        match Self::default_path() {
            Some(default) if default.exists() => Self::load_from_file(default).await,
            _ => {
                debug!("No configuration file found, using defaults");
                Ok(PathQueryConfig::default())
            }
        }
    }
}
