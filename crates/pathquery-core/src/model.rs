//! Data model that query paths are resolved against.
//!
//! A [`Model`] is a set of classes with typed attributes, references and
//! collections. Queries never carry raw path strings past deserialisation:
//! every path is turned into a [`Path`] through [`Model::resolve_path`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

/// Errors raised while loading a model definition
#[derive(Error, Debug)]
pub enum ModelError {
    /// The definition is not valid JSON for a model
    #[error("Invalid model definition: {0}")]
    Parse(#[from] serde_json::Error),

    /// A class names a superclass or referenced type that is not defined
    #[error("Class {class} refers to unknown class {missing}")]
    UnknownClass { class: String, missing: String },
}

/// Errors raised when a path does not resolve in a model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Empty path")]
    Empty,

    #[error("Path {path} is not in the model: there is no class {class}")]
    UnknownClass { path: String, class: String },

    #[error("Path {path} is not in the model: class {class} has no field {field}")]
    UnknownField {
        path: String,
        class: String,
        field: String,
    },

    #[error("Path {path} is not in the model: attribute {field} cannot have further fields")]
    AttributeNotTerminal { path: String, field: String },
}

/// Primitive type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
}

impl AttributeType {
    /// Whether values of this type have a meaningful ordering for `<`/`>`
    pub fn is_ordered(self) -> bool {
        !matches!(self, AttributeType::String | AttributeType::Boolean)
    }

    /// Check that a textual constraint value can be read as this type
    pub fn accepts(self, value: &str) -> bool {
        let value = value.trim();
        match self {
            AttributeType::String => true,
            AttributeType::Integer => value.parse::<i32>().is_ok(),
            AttributeType::Long => value.parse::<i64>().is_ok(),
            AttributeType::Float | AttributeType::Double => value.parse::<f64>().is_ok(),
            AttributeType::Boolean => value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false"),
            AttributeType::Date => DATE_RE.is_match(value),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Typed attribute of a class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
}

/// Reference or collection to another class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDescriptor {
    pub name: String,
    pub referenced_type: String,
}

/// A class in the model
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Filled from the map key when loaded from JSON
    #[serde(default, skip_serializing)]
    pub name: String,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeDescriptor>,
    #[serde(default)]
    pub references: Vec<ReferenceDescriptor>,
    #[serde(default)]
    pub collections: Vec<ReferenceDescriptor>,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.extends.push(superclass.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.into(),
            attribute_type,
        });
        self
    }

    pub fn reference(mut self, name: impl Into<String>, referenced_type: impl Into<String>) -> Self {
        self.references.push(ReferenceDescriptor {
            name: name.into(),
            referenced_type: referenced_type.into(),
        });
        self
    }

    pub fn collection(mut self, name: impl Into<String>, referenced_type: impl Into<String>) -> Self {
        self.collections.push(ReferenceDescriptor {
            name: name.into(),
            referenced_type: referenced_type.into(),
        });
        self
    }

    fn own_field(&self, name: &str) -> Option<Field<'_>> {
        if let Some(a) = self.attributes.iter().find(|a| a.name == name) {
            return Some(Field::Attribute(a));
        }
        if let Some(r) = self.references.iter().find(|r| r.name == name) {
            return Some(Field::Reference(r));
        }
        self.collections
            .iter()
            .find(|c| c.name == name)
            .map(Field::Collection)
    }
}

/// A field found on a class or one of its superclasses
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    Attribute(&'a AttributeDescriptor),
    Reference(&'a ReferenceDescriptor),
    Collection(&'a ReferenceDescriptor),
}

/// The data model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    #[serde(default)]
    classes: BTreeMap<String, ClassDescriptor>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: BTreeMap::new(),
        }
    }

    /// Add a class, replacing any class of the same name
    pub fn with_class(mut self, class: ClassDescriptor) -> Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    /// Load a model from its JSON definition and check that every class it
    /// mentions is defined.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let mut model: Model = serde_json::from_str(json)?;
        for (name, class) in model.classes.iter_mut() {
            class.name = name.clone();
        }
        model.check_closed()?;
        Ok(model)
    }

    fn check_closed(&self) -> Result<(), ModelError> {
        for class in self.classes.values() {
            let mentioned = class.extends.iter().chain(
                class
                    .references
                    .iter()
                    .chain(class.collections.iter())
                    .map(|r| &r.referenced_type),
            );
            for other in mentioned {
                if !self.classes.contains_key(other) {
                    return Err(ModelError::UnknownClass {
                        class: class.name.clone(),
                        missing: other.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self, name: &str) -> Option<&ClassDescriptor> {
        self.classes.get(name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Look up a field on a class, following superclasses breadth first
    pub fn field(&self, class: &str, field: &str) -> Option<Field<'_>> {
        self.ancestry(class)
            .into_iter()
            .filter_map(|c| self.classes.get(c))
            .find_map(|c| c.own_field(field))
    }

    /// Whether `sub` is `sup` or inherits from it
    pub fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        self.ancestry(sub).into_iter().any(|c| c == sup)
    }

    fn ancestry<'a>(&'a self, class: &'a str) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([class]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            order.push(current);
            if let Some(desc) = self.classes.get(current) {
                queue.extend(desc.extends.iter().map(String::as_str));
            }
        }
        order
    }

    /// Resolve a dotted path such as `Gene.organism.name`
    pub fn resolve_path(&self, text: &str) -> Result<Path, PathError> {
        let text = text.trim();
        let mut parts = text.split('.');
        let root = match parts.next() {
            Some(r) if !r.is_empty() => r,
            _ => return Err(PathError::Empty),
        };
        if !self.classes.contains_key(root) {
            return Err(PathError::UnknownClass {
                path: text.to_string(),
                class: root.to_string(),
            });
        }

        let mut end = PathEnd::Root(root.to_string());
        let mut segments = Vec::new();
        for part in parts {
            let current = match &end {
                PathEnd::Attribute(_) => {
                    return Err(PathError::AttributeNotTerminal {
                        path: text.to_string(),
                        field: segments.last().cloned().unwrap_or_default(),
                    })
                }
                PathEnd::Root(c) | PathEnd::Reference(c) | PathEnd::Collection(c) => c.clone(),
            };
            end = match self.field(&current, part) {
                Some(Field::Attribute(a)) => PathEnd::Attribute(a.attribute_type),
                Some(Field::Reference(r)) => PathEnd::Reference(r.referenced_type.clone()),
                Some(Field::Collection(c)) => PathEnd::Collection(c.referenced_type.clone()),
                None => {
                    return Err(PathError::UnknownField {
                        path: text.to_string(),
                        class: current,
                        field: part.to_string(),
                    })
                }
            };
            segments.push(part.to_string());
        }

        Ok(Path {
            text: text.to_string(),
            root: root.to_string(),
            segments,
            end,
        })
    }
}

/// What a resolved path points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathEnd {
    /// The path is just a class name
    Root(String),
    Attribute(AttributeType),
    Reference(String),
    Collection(String),
}

/// A path resolved against a model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    text: String,
    root: String,
    segments: Vec<String>,
    end: PathEnd,
}

impl Path {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn end(&self) -> &PathEnd {
        &self.end
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.end, PathEnd::Attribute(_))
    }

    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self.end {
            PathEnd::Attribute(t) => Some(t),
            _ => None,
        }
    }

    /// Class at the end of the path, `None` for attribute paths
    pub fn end_class(&self) -> Option<&str> {
        match &self.end {
            PathEnd::Root(c) | PathEnd::Reference(c) | PathEnd::Collection(c) => Some(c),
            PathEnd::Attribute(_) => None,
        }
    }

    /// Whether the path ends in a reference or collection (joinable)
    pub fn is_join_point(&self) -> bool {
        matches!(self.end, PathEnd::Reference(_) | PathEnd::Collection(_))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Path {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Small genomic-style model shared by the crate's unit tests
    pub(crate) fn genomic() -> Model {
        Model::new("genomic")
            .with_class(
                ClassDescriptor::new("BioEntity")
                    .attribute("primaryIdentifier", AttributeType::String)
                    .reference("organism", "Organism"),
            )
            .with_class(
                ClassDescriptor::new("Gene")
                    .extends("BioEntity")
                    .attribute("symbol", AttributeType::String)
                    .attribute("length", AttributeType::Integer)
                    .attribute("obsolete", AttributeType::Boolean)
                    .collection("proteins", "Protein"),
            )
            .with_class(
                ClassDescriptor::new("Protein")
                    .extends("BioEntity")
                    .attribute("molecularWeight", AttributeType::Double),
            )
            .with_class(
                ClassDescriptor::new("Organism")
                    .attribute("name", AttributeType::String)
                    .attribute("taxonId", AttributeType::Integer),
            )
    }

    #[test]
    fn test_resolve_attribute_path() {
        let path = genomic().resolve_path("Gene.symbol").unwrap();
        assert!(path.is_attribute());
        assert_eq!(path.attribute_type(), Some(AttributeType::String));
        assert_eq!(path.root(), "Gene");
    }

    #[test]
    fn test_resolve_inherited_reference() {
        let path = genomic().resolve_path("Gene.organism.taxonId").unwrap();
        assert_eq!(path.segments(), &["organism".to_string(), "taxonId".to_string()]);
        assert_eq!(path.attribute_type(), Some(AttributeType::Integer));
    }

    #[test]
    fn test_resolve_root_and_collection() {
        let model = genomic();
        assert_eq!(model.resolve_path("Gene").unwrap().end_class(), Some("Gene"));
        let proteins = model.resolve_path("Gene.proteins").unwrap();
        assert!(proteins.is_join_point());
        assert_eq!(proteins.end_class(), Some("Protein"));
    }

    #[test]
    fn test_resolve_errors() {
        let model = genomic();
        assert!(matches!(
            model.resolve_path("Transcript.symbol"),
            Err(PathError::UnknownClass { .. })
        ));
        assert!(matches!(
            model.resolve_path("Gene.nope"),
            Err(PathError::UnknownField { .. })
        ));
        assert!(matches!(
            model.resolve_path("Gene.symbol.length"),
            Err(PathError::AttributeNotTerminal { .. })
        ));
        assert_eq!(model.resolve_path(""), Err(PathError::Empty));
    }

    #[test]
    fn test_subclass() {
        let model = genomic();
        assert!(model.is_subclass("Gene", "BioEntity"));
        assert!(model.is_subclass("Gene", "Gene"));
        assert!(!model.is_subclass("BioEntity", "Gene"));
    }

    #[test]
    fn test_attribute_type_accepts() {
        assert!(AttributeType::Integer.accepts("42"));
        assert!(!AttributeType::Integer.accepts("4.2"));
        assert!(AttributeType::Double.accepts("4.2"));
        assert!(AttributeType::Boolean.accepts("TRUE"));
        assert!(AttributeType::Date.accepts("2019-01-31"));
        assert!(!AttributeType::Date.accepts("31/01/2019"));
    }

    #[test]
    fn test_model_from_json() {
        let json = r#"{
            "name": "genomic",
            "classes": {
                "Gene": {
                    "attributes": [{"name": "symbol", "type": "String"}],
                    "references": [{"name": "organism", "referencedType": "Organism"}]
                },
                "Organism": {
                    "attributes": [{"name": "name", "type": "String"}]
                }
            }
        }"#;
        let model = Model::from_json(json).unwrap();
        assert_eq!(model.class("Gene").unwrap().name, "Gene");
        assert!(model.resolve_path("Gene.organism.name").is_ok());
    }

    #[test]
    fn test_model_from_json_rejects_dangling_reference() {
        let json = r#"{"name": "m", "classes": {"Gene": {"extends": ["Missing"]}}}"#;
        assert!(matches!(
            Model::from_json(json),
            Err(ModelError::UnknownClass { .. })
        ));
    }
}
