use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::warn;

/// Reserved filter key carrying a raw disjunctive expression.
pub const OR_KEY: &str = "_or";

/// Comparison applied to a single column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
    Is,
    /// Only ever paired with a null operand: `is not null`.
    Not,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::Ilike => "ilike",
            Operator::In => "in",
            Operator::Is => "is",
            Operator::Not => "not",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column-scoped condition.
///
/// Serializes as a one-entry object, e.g. `{"eq": "abc"}`.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub operator: Operator,
    pub operand: Value,
}

impl Predicate {
    pub fn new(operator: Operator, operand: impl Into<Value>) -> Self {
        Self {
            operator,
            operand: operand.into(),
        }
    }

    pub fn not_null() -> Self {
        Self {
            operator: Operator::Not,
            operand: Value::Null,
        }
    }
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.as_str(), &self.operand)?;
        map.end()
    }
}

/// Column-keyed filter set plus the optional raw `_or` expression.
///
/// One predicate per column; setting a column again replaces what was there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filters {
    columns: BTreeMap<String, Predicate>,
    or: Option<String>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `predicate` for `column`. The reserved `_or` key is not a column;
    /// a predicate aimed at it is dropped with a warning and the set is unchanged.
    pub fn set(&mut self, column: impl Into<String>, predicate: Predicate) {
        let column = column.into();
        if column == OR_KEY {
            warn!(operator = %predicate.operator, "predicate on reserved `_or` key ignored");
            return;
        }
        self.columns.insert(column, predicate);
    }

    pub fn set_or(&mut self, expr: impl Into<String>) {
        self.or = Some(expr.into());
    }

    pub fn get(&self, column: &str) -> Option<&Predicate> {
        self.columns.get(column)
    }

    pub fn or_expr(&self) -> Option<&str> {
        self.or.as_deref()
    }

    /// Number of entries on the wire, counting `_or`.
    pub fn len(&self) -> usize {
        self.columns.len() + usize::from(self.or.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Predicate)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for Filters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, predicate) in &self.columns {
            map.serialize_entry(column, predicate)?;
        }
        if let Some(expr) = &self.or {
            map.serialize_entry(OR_KEY, expr)?;
        }
        map.end()
    }
}
