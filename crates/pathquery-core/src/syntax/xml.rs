//! XML query syntax.
//!
//! Parses queries like:
//!
//! ```xml
//! <query name="genes" model="genomic" view="Gene.symbol Gene.length"
//!        sortOrder="Gene.symbol asc" constraintLogic="A and B">
//!   <join path="Gene.proteins" style="OUTER"/>
//!   <constraint path="Gene" op="IN" value="favourites" code="A"/>
//!   <constraint path="Gene.symbol" op="ONE OF" code="B">
//!     <value>eve</value>
//!     <value>zen</value>
//!   </constraint>
//! </query>
//! ```
//!
//! Priority: 90 (claims everything starting with `<query`)

use super::{sort_pairs, QueryFormat, QuerySyntax, SyntaxError};
use crate::model::Model;
use crate::query::{Constraint, ConstraintKind, ConstraintOp, JoinStyle, PathQuery};
use crate::xml::{parse_document, XmlElement};

/// Newest query format version this parser understands
pub const USERPROFILE_VERSION: u32 = 2;

/// XML syntax parser
pub struct XmlSyntax;

impl QuerySyntax for XmlSyntax {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn format(&self) -> QueryFormat {
        QueryFormat::Xml
    }

    fn can_handle(&self, input: &str) -> bool {
        QueryFormat::detect(input) == QueryFormat::Xml
    }

    fn parse(&self, input: &str, model: &Model) -> Result<PathQuery, SyntaxError> {
        let root = parse_document(input)?;
        if root.name != "query" {
            return Err(SyntaxError::Structure(format!(
                "Expected a <query> element, found <{}>",
                root.name
            )));
        }
        check_version(&root)?;

        if let Some(found) = root.attr("model") {
            if found != model.name() {
                return Err(SyntaxError::ModelMismatch {
                    found: found.to_string(),
                    expected: model.name().to_string(),
                });
            }
        }

        let mut query = PathQuery::new(model.name());
        query.set_name(root.attr("name").map(str::to_string));
        query.set_description(root.attr("longDescription").map(str::to_string));
        query.set_constraint_logic(root.attr("constraintLogic").map(str::to_string));

        for path in root.attr("view").unwrap_or_default().split_whitespace() {
            query.add_view(model.resolve_path(path)?);
        }

        for (path, direction) in sort_pairs(root.attr("sortOrder").unwrap_or_default()) {
            query.add_order_by(model.resolve_path(path)?, direction);
        }

        for child in &root.children {
            match child.name.as_str() {
                "constraint" => query.add_constraint(parse_constraint(child, model)?),
                "join" => {
                    let path = required_attr(child, "path")?;
                    let style = match child.attr("style") {
                        Some(style) => style.parse::<JoinStyle>()?,
                        None => JoinStyle::Outer,
                    };
                    query.add_join(model.resolve_path(path)?, style);
                }
                "pathDescription" => {}
                other => {
                    return Err(SyntaxError::Structure(format!(
                        "Unexpected element <{}> on line {}",
                        other, child.line
                    )))
                }
            }
        }

        Ok(query.assign_codes())
    }

    fn priority(&self) -> u8 {
        90
    }
}

fn check_version(root: &XmlElement) -> Result<(), SyntaxError> {
    let Some(version) = root.attr("version") else {
        return Ok(());
    };
    match version.trim().parse::<u32>() {
        Ok(v) if v <= USERPROFILE_VERSION => Ok(()),
        _ => Err(SyntaxError::UnsupportedVersion {
            found: version.to_string(),
            supported: USERPROFILE_VERSION,
        }),
    }
}

fn required_attr<'a>(element: &'a XmlElement, name: &str) -> Result<&'a str, SyntaxError> {
    element.attr(name).ok_or_else(|| {
        SyntaxError::Structure(format!(
            "Element <{}> on line {} is missing attribute {}",
            element.name, element.line, name
        ))
    })
}

fn parse_constraint(element: &XmlElement, model: &Model) -> Result<Constraint, SyntaxError> {
    let path = model.resolve_path(required_attr(element, "path")?)?;
    let type_name = element.attr("type").map(str::to_string);
    let op = match (element.attr("op"), &type_name) {
        (Some(op), _) => op.parse::<ConstraintOp>()?,
        (None, Some(_)) => ConstraintOp::Isa,
        (None, None) => {
            return Err(SyntaxError::Structure(format!(
                "Constraint on {} (line {}) has no operator",
                path, element.line
            )))
        }
    };
    let values = element
        .children_named("value")
        .map(|v| v.text.clone())
        .collect();
    let kind = ConstraintKind::from_parts(
        &path,
        op,
        element.attr("value").map(str::to_string),
        values,
        element.attr("extraValue").map(str::to_string),
        type_name,
    )?;
    Ok(Constraint::new(
        path,
        kind,
        element.attr("code").map(str::to_string),
    ))
}
