//! JSON query syntax.
//!
//! ```json
//! {
//!   "model": {"name": "genomic"},
//!   "from": "Gene",
//!   "select": ["symbol", "organism.name"],
//!   "where": [
//!     {"path": "Gene", "op": "IN", "value": "onlySetA"},
//!     {"path": "length", "op": ">", "value": 1000}
//!   ],
//!   "sortOrder": [{"path": "symbol", "direction": "DESC"}],
//!   "constraintLogic": "A or B"
//! }
//! ```
//!
//! Paths not starting with `from` are taken relative to it. `where` may also
//! be an object keyed by path, in which case constraints are taken in key
//! order.
//!
//! Priority: 10 (fallback for anything that is not XML)

use super::{qualify, sort_pairs, QueryFormat, QuerySyntax, SyntaxError};
use crate::model::Model;
use crate::query::{Constraint, ConstraintKind, ConstraintOp, JoinStyle, PathQuery, SortDirection};
use serde::Deserialize;
use std::collections::BTreeMap;

/// JSON syntax parser
pub struct JsonSyntax;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelRef {
    Name(String),
    Object { name: String },
}

impl ModelRef {
    fn name(&self) -> &str {
        match self {
            ModelRef::Name(name) | ModelRef::Object { name } => name,
        }
    }
}

/// Scalar constraint value; numbers and booleans are kept as their text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
            Scalar::Bool(flag) => flag.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonConstraint {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    op: Option<String>,
    #[serde(default)]
    value: Option<Scalar>,
    #[serde(default)]
    values: Vec<Scalar>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    extra_value: Option<Scalar>,
    #[serde(default, rename = "type")]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WhereClause {
    List(Vec<JsonConstraint>),
    ByPath(BTreeMap<String, JsonConstraint>),
}

impl Default for WhereClause {
    fn default() -> Self {
        WhereClause::List(Vec::new())
    }
}

impl WhereClause {
    fn into_constraints(self) -> Vec<JsonConstraint> {
        match self {
            WhereClause::List(list) => list,
            WhereClause::ByPath(map) => map
                .into_iter()
                .map(|(path, mut constraint)| {
                    constraint.path.get_or_insert(path);
                    constraint
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SortItem {
    Text(String),
    Object {
        path: String,
        #[serde(default)]
        direction: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SortOrder {
    Text(String),
    List(Vec<SortItem>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JoinItem {
    Path(String),
    Object {
        path: String,
        #[serde(default)]
        style: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonQuery {
    #[serde(default)]
    model: Option<ModelRef>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    select: Vec<String>,
    #[serde(default, rename = "where")]
    constraints: WhereClause,
    #[serde(default)]
    sort_order: Option<SortOrder>,
    #[serde(default)]
    joins: Vec<JoinItem>,
    #[serde(default)]
    constraint_logic: Option<String>,
}

impl QuerySyntax for JsonSyntax {
    fn name(&self) -> &'static str {
        "json"
    }

    fn format(&self) -> QueryFormat {
        QueryFormat::Json
    }

    fn can_handle(&self, _input: &str) -> bool {
        true
    }

    fn parse(&self, input: &str, model: &Model) -> Result<PathQuery, SyntaxError> {
        let raw: JsonQuery = serde_json::from_str(input)?;

        if let Some(found) = &raw.model {
            if found.name() != model.name() {
                return Err(SyntaxError::ModelMismatch {
                    found: found.name().to_string(),
                    expected: model.name().to_string(),
                });
            }
        }

        let root = raw.from.as_deref();
        let resolve = |path: &str| model.resolve_path(&qualify(root, path));

        let mut query = PathQuery::new(model.name());
        query.set_name(raw.name.or(raw.title));
        query.set_description(raw.description);
        query.set_constraint_logic(raw.constraint_logic);

        for path in &raw.select {
            query.add_view(resolve(path.as_str())?);
        }

        for constraint in raw.constraints.into_constraints() {
            let path = constraint.path.ok_or_else(|| {
                SyntaxError::Structure("Every constraint needs a path".to_string())
            })?;
            let path = resolve(path.as_str())?;
            let op = match (&constraint.op, &constraint.type_name) {
                (Some(op), _) => op.parse::<ConstraintOp>()?,
                (None, Some(_)) => ConstraintOp::Isa,
                (None, None) => {
                    return Err(SyntaxError::Structure(format!(
                        "Constraint on {} has no operator",
                        path
                    )))
                }
            };
            let kind = ConstraintKind::from_parts(
                &path,
                op,
                constraint.value.map(String::from),
                constraint.values.into_iter().map(String::from).collect(),
                constraint.extra_value.map(String::from),
                constraint.type_name,
            )?;
            query.add_constraint(Constraint::new(path, kind, constraint.code));
        }

        match raw.sort_order {
            Some(SortOrder::Text(text)) => {
                for (path, direction) in sort_pairs(&text) {
                    query.add_order_by(resolve(path)?, direction);
                }
            }
            Some(SortOrder::List(items)) => {
                for item in items {
                    match item {
                        SortItem::Text(text) => {
                            for (path, direction) in sort_pairs(&text) {
                                query.add_order_by(resolve(path)?, direction);
                            }
                        }
                        SortItem::Object { path, direction } => {
                            let direction = match direction {
                                Some(direction) => direction.parse::<SortDirection>()?,
                                None => SortDirection::Asc,
                            };
                            query.add_order_by(resolve(path.as_str())?, direction);
                        }
                    }
                }
            }
            None => {}
        }

        for join in raw.joins {
            let (path, style) = match join {
                JoinItem::Path(path) => (path, JoinStyle::Outer),
                JoinItem::Object { path, style } => {
                    let style = match style {
                        Some(style) => style.parse::<JoinStyle>()?,
                        None => JoinStyle::Outer,
                    };
                    (path, style)
                }
            };
            query.add_join(resolve(path.as_str())?, style);
        }

        Ok(query.assign_codes())
    }

    fn priority(&self) -> u8 {
        10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::genomic;

    fn parse(input: &str) -> Result<PathQuery, SyntaxError> {
        JsonSyntax.parse(input, &genomic())
    }

    #[test]
    fn test_parse_relative_paths() {
        let query = parse(
            r#"{
                "model": {"name": "genomic"},
                "from": "Gene",
                "select": ["symbol", "Gene.organism.name"],
                "where": [
                    {"path": "Gene", "op": "IN", "value": "onlySetA"},
                    {"path": "length", "op": ">", "value": 1000}
                ],
                "sortOrder": [{"path": "symbol", "direction": "DESC"}],
                "constraintLogic": "A or B"
            }"#,
        )
        .unwrap();

        let view: Vec<_> = query.view().iter().map(|p| p.as_str()).collect();
        assert_eq!(view, vec!["Gene.symbol", "Gene.organism.name"]);
        assert_eq!(query.constraints()[1].to_string(), "[B] Gene.length > 1000");
        assert_eq!(query.order_by()[0].direction, SortDirection::Desc);
        assert_eq!(query.bag_names().into_iter().collect::<Vec<_>>(), vec!["onlySetA"]);
    }

    #[test]
    fn test_where_by_path_and_string_forms() {
        let query = parse(
            r#"{
                "model": "genomic",
                "title": "obsolete genes",
                "select": ["Gene.symbol"],
                "where": {"Gene.obsolete": {"op": "=", "value": true}},
                "sortOrder": "Gene.symbol desc",
                "joins": ["Gene.organism", {"path": "Gene.proteins", "style": "INNER"}]
            }"#,
        )
        .unwrap();

        assert_eq!(query.name(), Some("obsolete genes"));
        assert_eq!(
            query.constraint("A").unwrap().kind,
            ConstraintKind::Attribute {
                op: ConstraintOp::Equals,
                value: "true".to_string()
            }
        );
        assert_eq!(query.order_by()[0].direction, SortDirection::Desc);
        assert_eq!(query.joins()[0].style, JoinStyle::Outer);
        assert_eq!(query.joins()[1].style, JoinStyle::Inner);
    }

    #[test]
    fn test_binding_failures() {
        assert!(matches!(parse("not json"), Err(SyntaxError::Json(_))));
        assert!(matches!(parse(r#"{"select": "Gene.symbol"}"#), Err(SyntaxError::Json(_))));
        assert!(matches!(
            parse(r#"{"model": "other", "select": ["Gene.symbol"]}"#),
            Err(SyntaxError::ModelMismatch { .. })
        ));
        assert!(matches!(
            parse(r#"{"from": "Gene", "select": ["colour"]}"#),
            Err(SyntaxError::Path(_))
        ));
        assert!(matches!(
            parse(r#"{"select": ["Gene.symbol"], "where": [{"op": "=", "value": "x"}]}"#),
            Err(SyntaxError::Structure(_))
        ));
    }
}
