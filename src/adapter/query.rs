//! Query Translator
//!
//! Turns declarative queries into engine match specs and dispatches the
//! query operations (`all`, `count_all`, `delete_all`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::stream::StreamOptions;
use super::ttl::Ttl;
use super::CacheHandle;
use crate::engine::{Expr, Field, MatchSpec, Row};
use crate::error::{QueryError, Result};

// == Return Shape ==
/// Shape of each query/stream result, independent of the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Key,
    Value,
    KeyValue,
    Entry,
}

impl ReturnShape {
    /// Projection clause producing this shape.
    pub fn projection(&self) -> Vec<Field> {
        match self {
            ReturnShape::Key => vec![Field::Key],
            ReturnShape::Value => vec![Field::Value],
            ReturnShape::KeyValue => vec![Field::Key, Field::Value],
            ReturnShape::Entry => vec![Field::Key, Field::Value, Field::TouchedAt, Field::Ttl],
        }
    }
}

// == Query ==
/// Predicate plus optional caller-chosen projection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuerySpec {
    /// None matches every live entry
    pub predicate: Option<Expr>,
    /// None projects the key
    pub projection: Option<Vec<Field>>,
}

impl QuerySpec {
    pub fn filter(predicate: Expr) -> Self {
        Self {
            predicate: Some(predicate),
            projection: None,
        }
    }

    pub fn select(mut self, projection: Vec<Field>) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// Selector accepted by the query operations.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Query {
    /// Every live entry (the absent query)
    #[default]
    Everything,
    /// Entries whose TTL has elapsed
    Expired,
    /// Entries matching a predicate
    Match(QuerySpec),
}

/// Query operations the translator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    All,
    CountAll,
    DeleteAll,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::All => "all",
            Operation::CountAll => "count_all",
            Operation::DeleteAll => "delete_all",
        })
    }
}

// == Results ==
/// A full record, as produced by [`ReturnShape::Entry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    pub touched_at: DateTime<Utc>,
    pub ttl: Ttl,
}

/// One projected query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Projected {
    Key(String),
    Value(Value),
    KeyValue(String, Value),
    Entry(Entry),
    /// Raw row for a caller-supplied projection
    Row(Row),
}

impl Projected {
    /// Reshapes an engine row; `None` keeps the row as is.
    pub(crate) fn from_row(shape: Option<ReturnShape>, row: Row) -> std::result::Result<Self, String> {
        let Some(shape) = shape else {
            return Ok(Projected::Row(row));
        };
        let mut fields = row.into_iter();
        let mut next = || fields.next().ok_or_else(|| format!("row too short for {:?}", shape));

        Ok(match shape {
            ReturnShape::Key => Projected::Key(as_key(next()?)?),
            ReturnShape::Value => Projected::Value(next()?),
            ReturnShape::KeyValue => Projected::KeyValue(as_key(next()?)?, next()?),
            ReturnShape::Entry => {
                let key = as_key(next()?)?;
                let value = next()?;
                let touched_ms = next()?
                    .as_i64()
                    .ok_or_else(|| "touched_at is not an integer".to_string())?;
                let touched_at = DateTime::<Utc>::from_timestamp_millis(touched_ms)
                    .ok_or_else(|| format!("touched_at {} out of range", touched_ms))?;
                let ttl = Ttl::from_engine(next()?.as_u64());
                Projected::Entry(Entry {
                    key,
                    value,
                    touched_at,
                    ttl,
                })
            }
        })
    }

    /// The key, when the shape carries one.
    pub fn key(&self) -> Option<&str> {
        match self {
            Projected::Key(key) | Projected::KeyValue(key, _) => Some(key),
            Projected::Entry(entry) => Some(&entry.key),
            Projected::Value(_) | Projected::Row(_) => None,
        }
    }
}

fn as_key(value: Value) -> std::result::Result<String, String> {
    match value {
        Value::String(key) => Ok(key),
        other => Err(format!("expected a key, got {}", other)),
    }
}

/// Result of [`CacheHandle::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Count(usize),
    Entries(Vec<Projected>),
}

// == Build Query ==
/// Engine match spec plus the shape its rows decode into.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub spec: MatchSpec,
    pub shape: Option<ReturnShape>,
}

/// Translates a query into a match spec.
///
/// The return shape only rewrites the projection clause; the predicate is
/// carried over untouched. Without a shape, a caller projection yields raw
/// rows and no projection at all yields keys.
pub fn build_query(query: &Query, shape: Option<ReturnShape>) -> TranslatedQuery {
    let (predicate, projection) = match query {
        Query::Everything => (Expr::always(), None),
        Query::Expired => (Expr::Expired, None),
        Query::Match(spec) => (
            spec.predicate.clone().unwrap_or_else(Expr::always),
            spec.projection.clone(),
        ),
    };

    let (projection, shape) = match (shape, projection) {
        (Some(shape), _) => (shape.projection(), Some(shape)),
        (None, Some(custom)) => (custom, None),
        (None, None) => (ReturnShape::Key.projection(), Some(ReturnShape::Key)),
    };

    TranslatedQuery {
        spec: MatchSpec::new(predicate, projection),
        shape,
    }
}

impl CacheHandle {
    // == Execute ==
    /// Runs a query operation.
    ///
    /// Supported: `all` with any query, `count_all` over everything,
    /// `delete_all` over everything or expired entries. Anything else fails
    /// with a [`QueryError`] naming the operation.
    pub fn execute(
        &self,
        operation: Operation,
        query: &Query,
        opts: &StreamOptions,
    ) -> Result<QueryOutcome> {
        match (operation, query) {
            (Operation::CountAll, Query::Everything) => Ok(QueryOutcome::Count(self.engine.size())),
            (Operation::DeleteAll, Query::Everything) => {
                let removed = self.engine.clear();
                info!("Flushed {} entries from {}", removed, self.name());
                Ok(QueryOutcome::Count(removed))
            }
            (Operation::DeleteAll, Query::Expired) => {
                let removed = self.engine.purge_expired();
                info!("Purged {} expired entries from {}", removed, self.name());
                Ok(QueryOutcome::Count(removed))
            }
            (Operation::All, query) => Ok(QueryOutcome::Entries(self.all(query, opts)?)),
            (Operation::CountAll | Operation::DeleteAll, query) => {
                Err(QueryError::unsupported(operation, query).into())
            }
        }
    }

    /// Materializes every result of `query`.
    pub fn all(&self, query: &Query, opts: &StreamOptions) -> Result<Vec<Projected>> {
        self.stream(query, opts)?.into_iter().collect()
    }

    /// Counts the entries selected by `query`.
    pub fn count_all(&self, query: &Query) -> Result<usize> {
        self.count(Operation::CountAll, query)
    }

    /// Removes the entries selected by `query`, returning how many.
    pub fn delete_all(&self, query: &Query) -> Result<usize> {
        self.count(Operation::DeleteAll, query)
    }

    fn count(&self, operation: Operation, query: &Query) -> Result<usize> {
        match self.execute(operation, query, &StreamOptions::default())? {
            QueryOutcome::Count(count) => Ok(count),
            QueryOutcome::Entries(entries) => Ok(entries.len()),
        }
    }
}
