//! In-memory path query.
//!
//! A [`PathQuery`] is produced once by one of the syntaxes in
//! [`crate::syntax`] and is read-only afterwards. All paths it holds have
//! already been resolved against the model it was built for.

use crate::logic::is_reserved_code;
use crate::model::Path;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while assembling constraints and query parts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("Unknown constraint operator: {0}")]
    UnknownOperator(String),

    #[error("Operator {op} on {path} requires a value")]
    MissingValue { path: String, op: ConstraintOp },

    #[error("Constraint on {path} with operator ISA requires a type")]
    MissingType { path: String },

    #[error("Unknown sort direction: {0}")]
    UnknownDirection(String),

    #[error("Unknown join style: {0}")]
    UnknownJoinStyle(String),
}

/// Constraint operator as written on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConstraintOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanEquals,
    GreaterThan,
    GreaterThanEquals,
    Contains,
    DoesNotContain,
    Like,
    NotLike,
    OneOf,
    NoneOf,
    IsNull,
    IsNotNull,
    In,
    NotIn,
    Lookup,
    Isa,
}

impl ConstraintOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintOp::Equals => "=",
            ConstraintOp::NotEquals => "!=",
            ConstraintOp::LessThan => "<",
            ConstraintOp::LessThanEquals => "<=",
            ConstraintOp::GreaterThan => ">",
            ConstraintOp::GreaterThanEquals => ">=",
            ConstraintOp::Contains => "CONTAINS",
            ConstraintOp::DoesNotContain => "DOES NOT CONTAIN",
            ConstraintOp::Like => "LIKE",
            ConstraintOp::NotLike => "NOT LIKE",
            ConstraintOp::OneOf => "ONE OF",
            ConstraintOp::NoneOf => "NONE OF",
            ConstraintOp::IsNull => "IS NULL",
            ConstraintOp::IsNotNull => "IS NOT NULL",
            ConstraintOp::In => "IN",
            ConstraintOp::NotIn => "NOT IN",
            ConstraintOp::Lookup => "LOOKUP",
            ConstraintOp::Isa => "ISA",
        }
    }

    /// Ordered comparison operators
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            ConstraintOp::LessThan
                | ConstraintOp::LessThanEquals
                | ConstraintOp::GreaterThan
                | ConstraintOp::GreaterThanEquals
        )
    }
}

impl FromStr for ConstraintOp {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        let op = match normalised.as_str() {
            "=" | "==" => ConstraintOp::Equals,
            "!=" => ConstraintOp::NotEquals,
            "<" => ConstraintOp::LessThan,
            "<=" => ConstraintOp::LessThanEquals,
            ">" => ConstraintOp::GreaterThan,
            ">=" => ConstraintOp::GreaterThanEquals,
            "CONTAINS" => ConstraintOp::Contains,
            "DOES NOT CONTAIN" => ConstraintOp::DoesNotContain,
            "LIKE" => ConstraintOp::Like,
            "NOT LIKE" => ConstraintOp::NotLike,
            "ONE OF" => ConstraintOp::OneOf,
            "NONE OF" => ConstraintOp::NoneOf,
            "IS NULL" => ConstraintOp::IsNull,
            "IS NOT NULL" => ConstraintOp::IsNotNull,
            "IN" => ConstraintOp::In,
            "NOT IN" => ConstraintOp::NotIn,
            "LOOKUP" => ConstraintOp::Lookup,
            "ISA" => ConstraintOp::Isa,
            _ => return Err(ConstraintError::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a constraint compares its path against
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConstraintKind {
    /// Single-value comparison, including `LIKE`/`CONTAINS`
    Attribute { op: ConstraintOp, value: String },
    /// `ONE OF` / `NONE OF`
    MultiValue { op: ConstraintOp, values: Vec<String> },
    /// `IS NULL` / `IS NOT NULL`
    Null { op: ConstraintOp },
    /// `IN` / `NOT IN` a saved bag
    Bag { op: ConstraintOp, bag: String },
    Lookup {
        value: String,
        extra_value: Option<String>,
    },
    /// `ISA`: restrict the path to a subclass
    SubClass { type_name: String },
}

impl ConstraintKind {
    /// Build a constraint kind from the raw parts common to both syntaxes
    pub fn from_parts(
        path: &Path,
        op: ConstraintOp,
        value: Option<String>,
        values: Vec<String>,
        extra_value: Option<String>,
        type_name: Option<String>,
    ) -> Result<Self, ConstraintError> {
        let require = |value: Option<String>| {
            value.ok_or_else(|| ConstraintError::MissingValue {
                path: path.to_string(),
                op,
            })
        };
        let kind = match op {
            ConstraintOp::OneOf | ConstraintOp::NoneOf => {
                let mut values = values;
                if values.is_empty() {
                    values.extend(value);
                }
                ConstraintKind::MultiValue { op, values }
            }
            ConstraintOp::IsNull | ConstraintOp::IsNotNull => ConstraintKind::Null { op },
            ConstraintOp::In | ConstraintOp::NotIn => ConstraintKind::Bag {
                op,
                bag: require(value)?,
            },
            ConstraintOp::Lookup => ConstraintKind::Lookup {
                value: require(value)?,
                extra_value,
            },
            ConstraintOp::Isa => ConstraintKind::SubClass {
                type_name: type_name.or(value).ok_or_else(|| ConstraintError::MissingType {
                    path: path.to_string(),
                })?,
            },
            _ => ConstraintKind::Attribute {
                op,
                value: require(value)?,
            },
        };
        Ok(kind)
    }

    pub fn op(&self) -> ConstraintOp {
        match self {
            ConstraintKind::Attribute { op, .. }
            | ConstraintKind::MultiValue { op, .. }
            | ConstraintKind::Null { op }
            | ConstraintKind::Bag { op, .. } => *op,
            ConstraintKind::Lookup { .. } => ConstraintOp::Lookup,
            ConstraintKind::SubClass { .. } => ConstraintOp::Isa,
        }
    }
}

/// A constraint on one path of the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    /// Logic code; `None` only for subclass constraints, which take no part
    /// in constraint logic
    pub code: Option<String>,
    pub path: Path,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl Constraint {
    pub fn new(path: Path, kind: ConstraintKind, code: Option<String>) -> Self {
        Self { code, path, kind }
    }

    /// Name of the bag this constraint refers to, if any
    pub fn bag_name(&self) -> Option<&str> {
        match &self.kind {
            ConstraintKind::Bag { bag, .. } => Some(bag),
            _ => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = &self.code {
            write!(f, "[{}] ", code)?;
        }
        match &self.kind {
            ConstraintKind::Attribute { op, value } => write!(f, "{} {} {}", self.path, op, value),
            ConstraintKind::MultiValue { op, values } => {
                write!(f, "{} {} ({})", self.path, op, values.join(", "))
            }
            ConstraintKind::Null { op } => write!(f, "{} {}", self.path, op),
            ConstraintKind::Bag { op, bag } => write!(f, "{} {} {}", self.path, op, bag),
            ConstraintKind::Lookup { value, extra_value } => {
                write!(f, "{} LOOKUP {}", self.path, value)?;
                if let Some(extra) = extra_value {
                    write!(f, " IN {}", extra)?;
                }
                Ok(())
            }
            ConstraintKind::SubClass { type_name } => write!(f, "{} ISA {}", self.path, type_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(ConstraintError::UnknownDirection(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderElement {
    pub path: Path,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JoinStyle {
    Inner,
    Outer,
}

impl FromStr for JoinStyle {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INNER" => Ok(JoinStyle::Inner),
            "OUTER" => Ok(JoinStyle::Outer),
            _ => Err(ConstraintError::UnknownJoinStyle(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Join {
    pub path: Path,
    pub style: JoinStyle,
}

/// A validated query over a data model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathQuery {
    model: String,
    name: Option<String>,
    description: Option<String>,
    view: Vec<Path>,
    constraints: Vec<Constraint>,
    order_by: Vec<OrderElement>,
    joins: Vec<Join>,
    constraint_logic: Option<String>,
}

impl PathQuery {
    pub(crate) fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: None,
            description: None,
            view: Vec::new(),
            constraints: Vec::new(),
            order_by: Vec::new(),
            joins: Vec::new(),
            constraint_logic: None,
        }
    }

    pub(crate) fn set_name(&mut self, name: Option<String>) {
        self.name = name.filter(|n| !n.is_empty());
    }

    pub(crate) fn set_description(&mut self, description: Option<String>) {
        self.description = description.filter(|d| !d.is_empty());
    }

    pub(crate) fn set_constraint_logic(&mut self, logic: Option<String>) {
        self.constraint_logic = logic.map(|l| l.trim().to_string()).filter(|l| !l.is_empty());
    }

    pub(crate) fn add_view(&mut self, path: Path) {
        self.view.push(path);
    }

    pub(crate) fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub(crate) fn add_order_by(&mut self, path: Path, direction: SortDirection) {
        self.order_by.push(OrderElement { path, direction });
    }

    pub(crate) fn add_join(&mut self, path: Path, style: JoinStyle) {
        self.joins.push(Join { path, style });
    }

    /// Give every coded constraint without an explicit code the next unused
    /// code (`A`..`Z`, `AA`, ...). Explicit codes are left alone, even when
    /// duplicated; duplicates are reported by verification.
    pub(crate) fn assign_codes(mut self) -> Self {
        let mut used: HashSet<String> = self
            .constraints
            .iter()
            .filter_map(|c| c.code.clone())
            .collect();
        let mut next = 0usize;
        for constraint in self.constraints.iter_mut() {
            if constraint.code.is_some() || matches!(constraint.kind, ConstraintKind::SubClass { .. }) {
                continue;
            }
            let code = loop {
                let candidate = code_for_index(next);
                next += 1;
                if !used.contains(&candidate) && !is_reserved_code(&candidate) {
                    break candidate;
                }
            };
            used.insert(code.clone());
            constraint.code = Some(code);
        }
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Root class, taken from the first view path
    pub fn root_class(&self) -> Option<&str> {
        self.view
            .first()
            .or_else(|| self.constraints.first().map(|c| &c.path))
            .map(Path::root)
    }

    pub fn view(&self) -> &[Path] {
        &self.view
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, code: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.code.as_deref() == Some(code))
    }

    pub fn order_by(&self) -> &[OrderElement] {
        &self.order_by
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn constraint_logic(&self) -> Option<&str> {
        self.constraint_logic.as_deref()
    }

    /// Distinct names of the bags used by the constraints
    pub fn bag_names(&self) -> BTreeSet<String> {
        self.constraints
            .iter()
            .filter_map(Constraint::bag_name)
            .map(str::to_string)
            .collect()
    }
}

/// `0 -> A`, `25 -> Z`, `26 -> AA`
fn code_for_index(mut index: usize) -> String {
    let mut code = Vec::new();
    loop {
        code.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    code.reverse();
    String::from_utf8(code).unwrap_or_default()
}
