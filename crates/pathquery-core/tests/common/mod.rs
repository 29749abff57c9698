//! Shared fixtures for the builder integration tests

#![allow(dead_code)]

use pathquery_core::{BagState, Model, PathQueryBuilder, SavedBag, StaticSchemaLoader};
use std::sync::Arc;

pub const XSD: &str = include_str!("../../schemas/query.xsd");
pub const JSON_SCHEMA: &str = include_str!("../../schemas/query.schema.json");

pub const XSD_REF: &str = "mem:query.xsd";
pub const JSON_SCHEMA_REF: &str = "mem:query.schema.json";

pub fn model() -> Model {
    Model::from_json(include_str!("../fixtures/genomic_model.json"))
        .expect("fixture model should load")
}

pub fn schema_loader() -> StaticSchemaLoader {
    StaticSchemaLoader::new()
        .with_schema(XSD_REF, XSD)
        .with_schema(JSON_SCHEMA_REF, JSON_SCHEMA)
}

pub fn builder() -> PathQueryBuilder {
    PathQueryBuilder::new(Arc::new(schema_loader()))
}

pub fn bag(name: &str, state: BagState) -> SavedBag {
    SavedBag::new(name, state)
}

/// JSON query on genes restricted to one bag
pub fn json_bag_query(bag: &str) -> String {
    format!(
        r#"{{"model": {{"name": "genomic"}}, "from": "Gene", "select": ["symbol", "length"],
            "where": [{{"path": "Gene", "op": "IN", "value": "{}"}}]}}"#,
        bag
    )
}
