//! Schema retrieval through the default loader: HTTP and local files

mod common;

use common::{json_bag_query, model, JSON_SCHEMA, XSD};
use pathquery_core::{BagProducer, ErrorKind, PathQueryBuilder};
use std::io::Write;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn schema_server(route: &str, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_xml_schema_over_http() {
    let server = schema_server("/webservice/query.xsd", XSD).await;
    let reference = format!("{}/webservice/query.xsd", server.uri());

    let query = PathQueryBuilder::default()
        .build(
            r#"<query model="genomic" view="Gene.symbol"/>"#,
            &model(),
            &reference,
            BagProducer::from_bags(vec![]),
        )
        .await
        .expect("query should build");

    assert_eq!(query.view()[0].as_str(), "Gene.symbol");
}

#[tokio::test]
async fn test_schema_fetched_on_every_build() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query.schema.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(JSON_SCHEMA))
        .expect(2)
        .mount(&server)
        .await;
    let reference = format!("{}/query.schema.json", server.uri());

    let builder = PathQueryBuilder::default();
    for _ in 0..2 {
        let err = builder
            .build(
                &json_bag_query("onlySetA"),
                &model(),
                &reference,
                BagProducer::from_bags(vec![]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingBags);
    }
}

#[tokio::test]
async fn test_unreachable_schema_is_internal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = PathQueryBuilder::default()
        .build(
            r#"<query model="genomic" view="Gene.symbol"/>"#,
            &model(),
            &format!("{}/query.xsd", server.uri()),
            BagProducer::from_bags(vec![]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.message().contains("503"), "{}", err.message());
}

#[tokio::test]
async fn test_malformed_schema_document_is_internal() {
    let server = schema_server("/query.schema.json", "{ this is not a schema").await;

    let err = PathQueryBuilder::default()
        .build(
            r#"{"select": ["Gene.symbol"]}"#,
            &model(),
            &format!("{}/query.schema.json", server.uri()),
            BagProducer::from_bags(vec![]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[tokio::test]
async fn test_schema_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(XSD.as_bytes()).unwrap();
    let reference = format!("file://{}", file.path().display());

    let err = PathQueryBuilder::default()
        .build(
            r#"<query model="genomic"/>"#,
            &model(),
            &reference,
            BagProducer::from_bags(vec![]),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(err.message().contains("Attribute 'view' must appear on element 'query'"));
}
