//! Semantic checks on a deserialised query.
//!
//! Everything here works on the query and the model alone; saved bags are
//! checked separately in [`crate::bags`]. All problems are collected, in the
//! order the query parts appear.

use crate::logic::{is_reserved_code, LogicError, LogicExpr};
use crate::model::{Model, Path};
use crate::query::{Constraint, ConstraintKind, ConstraintOp, PathQuery};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Collect every semantic problem with `query`; empty means valid
pub fn verify_query(query: &PathQuery, model: &Model) -> Vec<String> {
    let mut problems = Vec::new();

    check_view(query, &mut problems);
    check_roots(query, &mut problems);
    check_codes(query, &mut problems);
    for constraint in query.constraints() {
        check_constraint(constraint, model, &mut problems);
    }
    for order in query.order_by() {
        if !order.path.is_attribute() {
            problems.push(format!("Sort order path {} must be an attribute", order.path));
        }
    }
    for join in query.joins() {
        if !join.path.is_join_point() {
            problems.push(format!(
                "Join path {} must end in a reference or collection",
                join.path
            ));
        }
    }
    check_logic(query, &mut problems);

    debug!("Query verification found {} problem(s)", problems.len());
    problems
}

fn check_view(query: &PathQuery, problems: &mut Vec<String>) {
    if query.view().is_empty() {
        problems.push("No columns specified for view".to_string());
    }
    let mut seen = HashSet::new();
    for path in query.view() {
        if !path.is_attribute() {
            problems.push(format!("Path {} in view list must be an attribute", path));
        }
        if !seen.insert(path.as_str()) {
            problems.push(format!("Duplicate path {} in view list", path));
        }
    }
}

fn check_roots(query: &PathQuery, problems: &mut Vec<String>) {
    let Some(root) = query.root_class() else {
        return;
    };
    let paths = query
        .view()
        .iter()
        .chain(query.constraints().iter().map(|c| &c.path))
        .chain(query.order_by().iter().map(|o| &o.path))
        .chain(query.joins().iter().map(|j| &j.path));

    let others: BTreeSet<&str> = paths.map(Path::root).filter(|r| *r != root).collect();
    for other in others {
        problems.push(format!(
            "Multiple root classes in query: {} and {}",
            root, other
        ));
    }
}

fn check_codes(query: &PathQuery, problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for code in query.constraints().iter().filter_map(|c| c.code.as_deref()) {
        if !seen.insert(code) && reported.insert(code) {
            problems.push(format!("Duplicate constraint code {}", code));
        }
        if is_reserved_code(code) && reported.insert(code) {
            problems.push(format!("Constraint code {} is a reserved word", code));
        }
    }
}

fn check_constraint(constraint: &Constraint, model: &Model, problems: &mut Vec<String>) {
    let path = &constraint.path;
    let op = constraint.kind.op();
    match &constraint.kind {
        ConstraintKind::Attribute { value, .. } => {
            if !path.is_attribute() {
                problems.push(format!("Operator {} on {} requires an attribute path", op, path));
            } else {
                check_value(path, op, value, problems);
            }
        }
        ConstraintKind::MultiValue { values, .. } => {
            if !path.is_attribute() {
                problems.push(format!("Operator {} on {} requires an attribute path", op, path));
            }
            if values.is_empty() {
                problems.push(format!("Operator {} on {} requires at least one value", op, path));
            }
            if path.is_attribute() {
                for value in values {
                    check_value(path, op, value, problems);
                }
            }
        }
        ConstraintKind::Null { .. } => {}
        ConstraintKind::Bag { .. } | ConstraintKind::Lookup { .. } => {
            if path.is_attribute() {
                problems.push(format!("Operator {} on {} requires a class path", op, path));
            }
        }
        ConstraintKind::SubClass { type_name } => match path.end_class() {
            None => problems.push(format!("Operator ISA on {} requires a class path", path)),
            Some(_) if model.class(type_name).is_none() => problems.push(format!(
                "Unknown class {} in subclass constraint on {}",
                type_name, path
            )),
            Some(class) if !model.is_subclass(type_name, class) => problems.push(format!(
                "{} is not a subclass of {} in constraint on {}",
                type_name, class, path
            )),
            Some(_) => {}
        },
    }
}

/// Type-check a comparison value. Pattern operators take free text.
fn check_value(path: &Path, op: ConstraintOp, value: &str, problems: &mut Vec<String>) {
    let Some(attribute_type) = path.attribute_type() else {
        return;
    };
    if matches!(
        op,
        ConstraintOp::Like
            | ConstraintOp::NotLike
            | ConstraintOp::Contains
            | ConstraintOp::DoesNotContain
    ) {
        return;
    }
    if op.is_ordering() && !attribute_type.is_ordered() {
        problems.push(format!(
            "Operator {} cannot be used on {} attribute {}",
            op, attribute_type, path
        ));
    } else if !attribute_type.accepts(value) {
        problems.push(format!(
            "Value '{}' for {} is not a valid {}",
            value, path, attribute_type
        ));
    }
}

fn check_logic(query: &PathQuery, problems: &mut Vec<String>) {
    let Some(logic) = query.constraint_logic() else {
        return;
    };
    let expr = match LogicExpr::parse(logic) {
        Ok(expr) => expr,
        Err(e @ LogicError::TooDeep(_)) => {
            problems.push(e.to_string());
            return;
        }
        Err(e) => {
            problems.push(format!("Invalid constraint logic '{}': {}", logic, e));
            return;
        }
    };
    let mentioned = expr.codes();
    let defined: BTreeSet<String> = query
        .constraints()
        .iter()
        .filter_map(|c| c.code.clone())
        .collect();
    for code in mentioned.difference(&defined) {
        problems.push(format!("Constraint logic refers to unknown code {}", code));
    }
    for code in defined.difference(&mentioned) {
        problems.push(format!("Constraint logic does not mention code {}", code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::genomic;
    use crate::syntax::{JsonSyntax, QuerySyntax};

    fn problems(input: &str) -> Vec<String> {
        let model = genomic();
        let query = JsonSyntax.parse(input, &model).unwrap();
        verify_query(&query, &model)
    }

    #[test]
    fn test_valid_query_has_no_problems() {
        let found = problems(
            r#"{"from": "Gene", "select": ["symbol", "length"],
                "where": [
                    {"path": "Gene", "op": "IN", "value": "setA"},
                    {"path": "length", "op": ">=", "value": 100},
                    {"path": "proteins", "type": "Protein"},
                    {"path": "symbol", "op": "ONE OF", "values": ["eve", "zen"]}
                ],
                "sortOrder": "Gene.length desc",
                "joins": ["proteins"],
                "constraintLogic": "(A or B) and C"}"#,
        );
        assert!(found.is_empty(), "{:?}", found);
    }

    #[test]
    fn test_view_problems() {
        let found = problems(r#"{"select": []}"#);
        assert_eq!(found, vec!["No columns specified for view"]);

        let found = problems(r#"{"select": ["Gene.organism", "Gene.symbol", "Gene.symbol"]}"#);
        assert_eq!(
            found,
            vec![
                "Path Gene.organism in view list must be an attribute",
                "Duplicate path Gene.symbol in view list",
            ]
        );
    }

    #[test]
    fn test_mixed_roots() {
        let found = problems(
            r#"{"select": ["Gene.symbol", "Protein.molecularWeight"],
                "where": [{"path": "Organism.name", "op": "=", "value": "fly"}]}"#,
        );
        assert_eq!(
            found,
            vec![
                "Multiple root classes in query: Gene and Organism",
                "Multiple root classes in query: Gene and Protein",
            ]
        );
    }

    #[test]
    fn test_operator_and_value_problems() {
        let found = problems(
            r#"{"from": "Gene", "select": ["symbol"],
                "where": [
                    {"path": "organism", "op": "=", "value": "fly", "code": "A"},
                    {"path": "symbol", "op": "IN", "value": "setA", "code": "B"},
                    {"path": "length", "op": "<", "value": "long", "code": "C"},
                    {"path": "obsolete", "op": ">", "value": true, "code": "D"},
                    {"path": "symbol", "op": "NONE OF", "values": [], "code": "E"},
                    {"path": "symbol", "op": "LIKE", "value": "eve*", "code": "E"}
                ]}"#,
        );
        assert_eq!(
            found,
            vec![
                "Duplicate constraint code E",
                "Operator = on Gene.organism requires an attribute path",
                "Operator IN on Gene.symbol requires a class path",
                "Value 'long' for Gene.length is not a valid Integer",
                "Operator > cannot be used on Boolean attribute Gene.obsolete",
                "Operator NONE OF on Gene.symbol requires at least one value",
            ]
        );
    }

    #[test]
    fn test_subclass_problems() {
        let found = problems(
            r#"{"from": "Gene", "select": ["symbol"],
                "where": [
                    {"path": "organism", "type": "Gene"},
                    {"path": "proteins", "type": "Transcript"}
                ]}"#,
        );
        assert_eq!(
            found,
            vec![
                "Gene is not a subclass of Organism in constraint on Gene.organism",
                "Unknown class Transcript in subclass constraint on Gene.proteins",
            ]
        );
    }

    #[test]
    fn test_sort_and_join_problems() {
        let found = problems(
            r#"{"from": "Gene", "select": ["symbol"],
                "sortOrder": [{"path": "organism"}], "joins": ["symbol"]}"#,
        );
        assert_eq!(
            found,
            vec![
                "Sort order path Gene.organism must be an attribute",
                "Join path Gene.symbol must end in a reference or collection",
            ]
        );
    }

    #[test]
    fn test_logic_problems() {
        let query = r#"{"from": "Gene", "select": ["symbol"],
            "where": [
                {"path": "symbol", "op": "=", "value": "eve"},
                {"path": "length", "op": ">", "value": 10}
            ],
            "constraintLogic": "LOGIC"}"#;
        assert_eq!(
            problems(query),
            vec![
                "Constraint logic refers to unknown code LOGIC",
                "Constraint logic does not mention code A",
                "Constraint logic does not mention code B",
            ]
        );

        let broken = query.replace("LOGIC", "A and (B");
        let found = problems(&broken);
        assert_eq!(found.len(), 1);
        assert!(found[0].starts_with("Invalid constraint logic 'A and (B'"));
    }

    #[test]
    fn test_deeply_nested_logic_is_a_problem() {
        let logic = format!("{}A and B{}", "(".repeat(100_000), ")".repeat(100_000));
        let query = format!(
            r#"{{"from": "Gene", "select": ["symbol"],
                "where": [
                    {{"path": "symbol", "op": "=", "value": "eve"}},
                    {{"path": "length", "op": ">", "value": 10}}
                ],
                "constraintLogic": "{}"}}"#,
            logic
        );
        assert_eq!(
            problems(&query),
            vec!["Constraint logic nests parentheses deeper than 64"]
        );
    }

    #[test]
    fn test_keyword_codes_are_reserved() {
        let found = problems(
            r#"{"from": "Gene", "select": ["symbol"],
                "where": [{"path": "symbol", "op": "=", "value": "eve", "code": "OR"}]}"#,
        );
        assert_eq!(found, vec!["Constraint code OR is a reserved word"]);
    }
}
