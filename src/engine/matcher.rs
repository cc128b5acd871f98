//! Match Spec Module
//!
//! The engine's native query form: a predicate expression over entry fields
//! and a projection list selecting which fields each matching row carries.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entry::EngineEntry;
use crate::error::EngineError;

/// One projected row, one value per projected field.
pub type Row = Vec<Value>;

// == Field ==
/// Addressable entry fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Key,
    Value,
    /// Unix milliseconds of the last write/touch
    TouchedAt,
    /// TTL in milliseconds, `null` when the entry never expires
    Ttl,
}

impl Field {
    /// Reads the field from a stored entry.
    pub fn read(&self, key: &str, entry: &EngineEntry) -> Value {
        match self {
            Field::Key => Value::String(key.to_string()),
            Field::Value => entry.value.clone(),
            Field::TouchedAt => Value::from(entry.touched_at),
            Field::Ttl => entry.ttl.map(Value::from).unwrap_or(Value::Null),
        }
    }
}

// == Expr ==
/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Const(Value),
    Field(Field),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// True when the entry's TTL has elapsed
    Expired,
}

impl Expr {
    /// Predicate matching every entry.
    pub fn always() -> Self {
        Expr::Const(Value::Bool(true))
    }

    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Const(value.into())
    }

    pub fn field(field: Field) -> Self {
        Expr::Field(field)
    }

    pub fn equals(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn not_equals(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut terms) => {
                terms.push(other);
                Expr::And(terms)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut terms) => {
                terms.push(other);
                Expr::Or(terms)
            }
            first => Expr::Or(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Whether the expression references the `expired` selector anywhere.
    pub fn mentions_expired(&self) -> bool {
        match self {
            Expr::Expired => true,
            Expr::Const(_) | Expr::Field(_) => false,
            Expr::Eq(a, b)
            | Expr::Ne(a, b)
            | Expr::Lt(a, b)
            | Expr::Le(a, b)
            | Expr::Gt(a, b)
            | Expr::Ge(a, b) => a.mentions_expired() || b.mentions_expired(),
            Expr::And(terms) | Expr::Or(terms) => terms.iter().any(Expr::mentions_expired),
            Expr::Not(inner) => inner.mentions_expired(),
        }
    }

    // == Static Checks ==
    /// Rejects shapes that can never evaluate to a boolean.
    fn check_boolean_position(&self) -> Result<(), EngineError> {
        match self {
            Expr::Const(Value::Bool(_)) | Expr::Field(_) | Expr::Expired => Ok(()),
            Expr::Const(other) => Err(EngineError::BadMatchSpec(format!(
                "constant {} used as a condition",
                other
            ))),
            Expr::And(terms) | Expr::Or(terms) => {
                terms.iter().try_for_each(Expr::check_boolean_position)
            }
            Expr::Not(inner) => inner.check_boolean_position(),
            Expr::Eq(..) | Expr::Ne(..) | Expr::Lt(..) | Expr::Le(..) | Expr::Gt(..) | Expr::Ge(..) => {
                Ok(())
            }
        }
    }

    // == Evaluate ==
    fn eval(&self, key: &str, entry: &EngineEntry, now: u64) -> Result<Value, EngineError> {
        let value = match self {
            Expr::Const(value) => value.clone(),
            Expr::Field(field) => field.read(key, entry),
            Expr::Expired => Value::Bool(entry.is_expired_at(now)),
            Expr::Eq(a, b) => Value::Bool(loose_eq(&a.eval(key, entry, now)?, &b.eval(key, entry, now)?)),
            Expr::Ne(a, b) => Value::Bool(!loose_eq(&a.eval(key, entry, now)?, &b.eval(key, entry, now)?)),
            Expr::Lt(a, b) => Value::Bool(self.order(a, b, key, entry, now)?.is_lt()),
            Expr::Le(a, b) => Value::Bool(self.order(a, b, key, entry, now)?.is_le()),
            Expr::Gt(a, b) => Value::Bool(self.order(a, b, key, entry, now)?.is_gt()),
            Expr::Ge(a, b) => Value::Bool(self.order(a, b, key, entry, now)?.is_ge()),
            Expr::And(terms) => {
                for term in terms {
                    if !term.eval_bool(key, entry, now)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            Expr::Or(terms) => {
                for term in terms {
                    if term.eval_bool(key, entry, now)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
            Expr::Not(inner) => Value::Bool(!inner.eval_bool(key, entry, now)?),
        };
        Ok(value)
    }

    fn eval_bool(&self, key: &str, entry: &EngineEntry, now: u64) -> Result<bool, EngineError> {
        match self.eval(key, entry, now)? {
            Value::Bool(b) => Ok(b),
            other => Err(EngineError::BadMatchSpec(format!(
                "condition evaluated to non-boolean {} for key '{}'",
                other, key
            ))),
        }
    }

    fn order(
        &self,
        a: &Expr,
        b: &Expr,
        key: &str,
        entry: &EngineEntry,
        now: u64,
    ) -> Result<Ordering, EngineError> {
        let (left, right) = (a.eval(key, entry, now)?, b.eval(key, entry, now)?);
        compare(&left, &right).ok_or_else(|| {
            EngineError::BadMatchSpec(format!("cannot order {} against {}", left, right))
        })
    }
}

/// Equality where numbers compare by numeric value.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering for scalars of the same kind, None otherwise.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

// == Match Spec ==
/// Predicate plus projection, as consumed by the engine cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSpec {
    pub predicate: Expr,
    pub projection: Vec<Field>,
}

impl MatchSpec {
    pub fn new(predicate: Expr, projection: Vec<Field>) -> Self {
        Self {
            predicate,
            projection,
        }
    }

    /// Checks what can be checked without touching any entry.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.projection.is_empty() {
            return Err(EngineError::BadMatchSpec("empty projection".to_string()));
        }
        self.predicate.check_boolean_position()
    }

    /// Whether expired entries are visible to this spec.
    pub fn selects_expired(&self) -> bool {
        self.predicate.mentions_expired()
    }

    /// Evaluates the predicate against one entry.
    pub fn matches(&self, key: &str, entry: &EngineEntry, now: u64) -> Result<bool, EngineError> {
        self.predicate.eval_bool(key, entry, now)
    }

    /// Builds the projected row for one entry.
    pub fn project(&self, key: &str, entry: &EngineEntry) -> Row {
        self.projection
            .iter()
            .map(|field| field.read(key, entry))
            .collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: Value) -> EngineEntry {
        EngineEntry {
            value,
            touched_at: 1_000,
            ttl: None,
        }
    }

    #[test]
    fn test_comparison_on_value_field() {
        let spec = MatchSpec::new(
            Expr::field(Field::Value).gt(Expr::lit(10)),
            vec![Field::Key],
        );
        assert!(spec.matches("a", &entry(json!(12)), 2_000).unwrap());
        assert!(!spec.matches("a", &entry(json!(8)), 2_000).unwrap());
    }

    #[test]
    fn test_numeric_equality_ignores_representation() {
        let spec = MatchSpec::new(
            Expr::field(Field::Value).equals(Expr::lit(2.0)),
            vec![Field::Key],
        );
        assert!(spec.matches("a", &entry(json!(2)), 0).unwrap());
    }

    #[test]
    fn test_and_or_not() {
        let pred = Expr::field(Field::Key)
            .equals(Expr::lit("a"))
            .or(Expr::field(Field::Key).equals(Expr::lit("b")))
            .and(Expr::field(Field::Value).equals(Expr::lit(1)).negate());
        let spec = MatchSpec::new(pred, vec![Field::Key]);

        assert!(spec.matches("b", &entry(json!(2)), 0).unwrap());
        assert!(!spec.matches("b", &entry(json!(1)), 0).unwrap());
        assert!(!spec.matches("c", &entry(json!(2)), 0).unwrap());
    }

    #[test]
    fn test_mismatched_ordering_is_rejected() {
        let spec = MatchSpec::new(
            Expr::field(Field::Value).lt(Expr::lit("x")),
            vec![Field::Key],
        );
        let err = spec.matches("a", &entry(json!(1)), 0).unwrap_err();
        assert!(matches!(err, EngineError::BadMatchSpec(_)));
    }

    #[test]
    fn test_non_boolean_condition_is_rejected() {
        let spec = MatchSpec::new(Expr::field(Field::Value), vec![Field::Key]);
        assert!(spec.validate().is_ok());
        assert!(spec.matches("a", &entry(json!("text")), 0).is_err());

        let spec = MatchSpec::new(Expr::lit(3), vec![Field::Key]);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_empty_projection_is_rejected() {
        let spec = MatchSpec::new(Expr::always(), vec![]);
        assert!(matches!(spec.validate(), Err(EngineError::BadMatchSpec(_))));
    }

    #[test]
    fn test_expired_selector() {
        let spec = MatchSpec::new(Expr::Expired, vec![Field::Key]);
        let mut e = entry(json!(1));
        e.ttl = Some(100);

        assert!(spec.selects_expired());
        assert!(!spec.matches("a", &e, 1_050).unwrap());
        assert!(spec.matches("a", &e, 1_100).unwrap());
    }

    #[test]
    fn test_projection_reads_fields() {
        let spec = MatchSpec::new(
            Expr::always(),
            vec![Field::Key, Field::Value, Field::TouchedAt, Field::Ttl],
        );
        let row = spec.project("k", &entry(json!({"a": 1})));
        assert_eq!(row, vec![json!("k"), json!({"a": 1}), json!(1_000), Value::Null]);
    }
}
