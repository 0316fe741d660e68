use serde_json::Value;
use tracing::warn;

use crate::descriptor::QueryDescriptor;
use crate::predicate::{Operator, Predicate};

/// Column filter surface shared by every chainable query value.
///
/// Implementors supply the two primitive steps; the named operators are
/// provided on top of them. Each call replaces whatever predicate the column
/// already had.
pub trait Filterable: Sized {
    fn filter(self, column: impl Into<String>, predicate: Predicate) -> Self;

    /// Raw disjunction in the gateway's own expression syntax.
    fn or(self, expr: impl Into<String>) -> Self;

    fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Eq, value))
    }

    fn neq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Neq, value))
    }

    fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Gt, value))
    }

    fn gte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Gte, value))
    }

    fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Lt, value))
    }

    fn lte(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Lte, value))
    }

    fn like(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(column, Predicate::new(Operator::Like, Value::String(pattern.into())))
    }

    fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filter(column, Predicate::new(Operator::Ilike, Value::String(pattern.into())))
    }

    fn in_<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(column, Predicate::new(Operator::In, values))
    }

    /// `is` comparison, for `null` and booleans.
    fn is(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, Predicate::new(Operator::Is, value))
    }

    /// Negation. Only `not(column, "is", null)` is understood; any other
    /// combination leaves the query untouched.
    fn not(self, column: impl Into<String>, operator: &str, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        if operator == Operator::Is.as_str() && value.is_null() {
            self.filter(column, Predicate::not_null())
        } else {
            warn!(%column, operator, %value, "unsupported negation ignored");
            self
        }
    }

    fn is_not_null(self, column: impl Into<String>) -> Self {
        self.filter(column, Predicate::not_null())
    }
}

impl Filterable for QueryDescriptor {
    fn filter(self, column: impl Into<String>, predicate: Predicate) -> Self {
        self.with_filter(column, predicate)
    }

    fn or(self, expr: impl Into<String>) -> Self {
        self.with_or(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plaza_types::Entity;
    use serde_json::json;

    #[test]
    fn named_operators_store_matching_predicates() {
        let d = QueryDescriptor::select(Entity::Posts)
            .eq("a", 1)
            .neq("b", "x")
            .gt("c", 2)
            .gte("d", 3)
            .lt("e", 4)
            .lte("f", 5)
            .like("g", "%hi%")
            .ilike("h", "%HI%")
            .in_("i", ["p", "q"])
            .is("j", Value::Null);

        let wire = serde_json::to_value(&d.filters).unwrap();
        assert_eq!(
            wire,
            json!({
                "a": {"eq": 1},
                "b": {"neq": "x"},
                "c": {"gt": 2},
                "d": {"gte": 3},
                "e": {"lt": 4},
                "f": {"lte": 5},
                "g": {"like": "%hi%"},
                "h": {"ilike": "%HI%"},
                "i": {"in": ["p", "q"]},
                "j": {"is": null}
            })
        );
    }

    #[test]
    fn not_only_understands_is_null() {
        let d = QueryDescriptor::select(Entity::Stories).not("media_url", "is", Value::Null);
        assert_eq!(d.filters.get("media_url"), Some(&Predicate::not_null()));

        let untouched = QueryDescriptor::select(Entity::Stories).not("views", "eq", 3);
        assert!(untouched.filters.is_empty());

        let shorthand = QueryDescriptor::select(Entity::Stories).is_not_null("media_url");
        assert_eq!(shorthand, d);
    }

    #[test]
    fn refiltering_a_column_overwrites() {
        let d = QueryDescriptor::select(Entity::Polls)
            .eq("status", "open")
            .gt("status", "a")
            .neq("status", "closed");
        assert_eq!(d.filters.len(), 1);
        assert_eq!(
            d.filters.get("status"),
            Some(&Predicate::new(Operator::Neq, "closed"))
        );
    }
}
