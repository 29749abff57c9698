//! Schema document retrieval

use super::{SchemaError, SchemaLoader};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where a schema reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaReference {
    Http(String),
    File(PathBuf),
}

impl SchemaReference {
    /// `http(s)://` URLs go over the network, `file://` URLs and bare paths
    /// are read from disk. Any other scheme is rejected.
    pub fn parse(reference: &str) -> Result<Self, SchemaError> {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return Ok(SchemaReference::Http(reference.to_string()));
        }
        if let Some(path) = reference.strip_prefix("file://") {
            return Ok(SchemaReference::File(PathBuf::from(path)));
        }
        if reference.is_empty() || reference.contains("://") {
            return Err(SchemaError::UnsupportedReference(reference.to_string()));
        }
        Ok(SchemaReference::File(PathBuf::from(reference)))
    }
}

/// Loads schemas over HTTP or from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct DefaultSchemaLoader {
    client: Client,
}

impl DefaultSchemaLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SchemaLoader for DefaultSchemaLoader {
    async fn load(&self, reference: &str) -> Result<String, SchemaError> {
        info!("Using the schema reference {}", reference);
        match SchemaReference::parse(reference)? {
            SchemaReference::Http(url) => {
                let response = self
                    .client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|source| SchemaError::Fetch {
                        reference: reference.to_string(),
                        source,
                    })?;
                let status = response.status();
                if !status.is_success() {
                    return Err(SchemaError::Status {
                        reference: reference.to_string(),
                        status: status.as_u16(),
                    });
                }
                let body = response.text().await.map_err(|source| SchemaError::Fetch {
                    reference: reference.to_string(),
                    source,
                })?;
                debug!("Fetched {} bytes of schema from {}", body.len(), url);
                Ok(body)
            }
            SchemaReference::File(path) => tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SchemaError::Io {
                    reference: reference.to_string(),
                    source,
                }),
        }
    }
}

/// Serves schema documents registered in memory under their reference
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaLoader {
    schemas: HashMap<String, String>,
}

impl StaticSchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, reference: impl Into<String>, document: impl Into<String>) -> Self {
        self.schemas.insert(reference.into(), document.into());
        self
    }
}

#[async_trait]
impl SchemaLoader for StaticSchemaLoader {
    async fn load(&self, reference: &str) -> Result<String, SchemaError> {
        self.schemas
            .get(reference)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_reference() {
        assert_eq!(
            SchemaReference::parse("https://example.org/query.xsd").unwrap(),
            SchemaReference::Http("https://example.org/query.xsd".to_string())
        );
        assert_eq!(
            SchemaReference::parse("file:///etc/query.xsd").unwrap(),
            SchemaReference::File(PathBuf::from("/etc/query.xsd"))
        );
        assert_eq!(
            SchemaReference::parse("schemas/query.xsd").unwrap(),
            SchemaReference::File(PathBuf::from("schemas/query.xsd"))
        );
        assert!(matches!(
            SchemaReference::parse("ftp://example.org/query.xsd"),
            Err(SchemaError::UnsupportedReference(_))
        ));
    }

    #[tokio::test]
    async fn test_load_over_http() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schema/query.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"type": "object"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let loader = DefaultSchemaLoader::default();
        let reference = format!("{}/schema/query.json", mock_server.uri());
        let body = loader.load(&reference).await.unwrap();
        assert_eq!(body, r#"{"type": "object"}"#);
    }

    #[tokio::test]
    async fn test_http_error_status_is_schema_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let loader = DefaultSchemaLoader::default();
        let result = loader.load(&format!("{}/missing.xsd", mock_server.uri())).await;
        assert!(matches!(result, Err(SchemaError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "<xs:schema/>").unwrap();

        let loader = DefaultSchemaLoader::default();
        let reference = format!("file://{}", file.path().display());
        assert_eq!(loader.load(&reference).await.unwrap(), "<xs:schema/>");

        let missing = loader.load("/definitely/not/here.xsd").await;
        assert!(matches!(missing, Err(SchemaError::Io { .. })));
    }

    #[tokio::test]
    async fn test_static_loader() {
        let loader = StaticSchemaLoader::new().with_schema("mem:query", "{}");
        assert_eq!(loader.load("mem:query").await.unwrap(), "{}");
        assert!(matches!(
            loader.load("mem:other").await,
            Err(SchemaError::NotFound(_))
        ));
    }
}
