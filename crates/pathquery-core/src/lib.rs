//! # pathquery-core
//!
//! Builds validated path queries over a typed data model from XML or JSON
//! input.
//!
//! ## Pipeline
//!
//! ```text
//! input ──► schema check ──► syntax ──► verify ──► bag check ──► PathQuery
//!            (XSD / JSON      (XML /      (model     (saved bags,
//!             Schema)          JSON)       only)      fetched lazily)
//! ```
//!
//! Each stage collects every problem it finds; the first failing stage ends
//! the build with a classified [`BuildError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pathquery_core::{BagProducer, Model, PathQueryBuilder};
//!
//! # async fn run(model_json: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let model = Model::from_json(model_json)?;
//! let builder = PathQueryBuilder::default();
//! let query = builder
//!     .build(
//!         r#"{"from": "Gene", "select": ["symbol"]}"#,
//!         &model,
//!         "https://example.org/schema/query.schema.json",
//!         BagProducer::from_bags(vec![]),
//!     )
//!     .await?;
//! println!("{:?}", query.view());
//! # Ok(())
//! # }
//! ```

pub mod bags;
pub mod builder;
pub mod error;
pub mod logic;
pub mod model;
pub mod profile;
pub mod query;
pub mod schema;
pub mod syntax;
pub mod verify;
pub mod xml;

pub use bags::{check_bags, BagCheck, BagProducer, BagSourceError, BagState, SavedBag, SavedBags};
pub use builder::{format_message, PathQueryBuilder};
pub use error::{BuildError, ErrorKind};
pub use model::{AttributeType, ClassDescriptor, Model, ModelError, Path, PathError};
pub use profile::{
    update_list_description, BagStore, InMemoryProfile, ListSummary, ListUpdateError, ProfileError,
};
pub use query::{Constraint, ConstraintKind, ConstraintOp, JoinStyle, PathQuery, SortDirection};
pub use schema::{DefaultSchemaLoader, SchemaError, SchemaLoader, StaticSchemaLoader};
pub use syntax::QueryFormat;
pub use verify::verify_query;
