//! Error types for the cache bridge
//!
//! Provides unified error handling using thiserror. The adapter only raises
//! `QueryError` and `PersistenceError` itself; everything else is an engine
//! failure that surfaces unchanged.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Query Error ==
/// Raised for unsupported operation/query combinations and for predicates or
/// projections the engine rejects while executing or streaming.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (operation: {operation}, query: {query})")]
pub struct QueryError {
    /// Operation that was attempted (`all`, `count_all`, `stream`, ...)
    pub operation: String,
    /// Rendering of the offending query
    pub query: String,
    /// Human readable reason, the engine's message when it rejected the query
    pub message: String,
}

impl QueryError {
    /// Creates a QueryError for an operation the translator does not support.
    pub fn unsupported(operation: impl fmt::Display, query: impl fmt::Debug) -> Self {
        Self {
            operation: operation.to_string(),
            query: format!("{:?}", query),
            message: format!("unsupported operation: {}", operation),
        }
    }

    /// Wraps an engine rejection of a query.
    pub fn rejected(
        operation: impl fmt::Display,
        query: impl fmt::Debug,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.to_string(),
            query: format!("{:?}", query),
            message: message.into(),
        }
    }
}

// == Persistence Error ==
/// Reason code reported by the engine's snapshot mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceReason {
    /// The target could not be opened, created or written
    FileUnreachable,
    /// The snapshot file does not exist
    FileNotFound,
    /// The snapshot file exists but could not be decoded
    InvalidSnapshot,
}

impl PersistenceReason {
    /// Stable string form of the reason code.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceReason::FileUnreachable => "file_unreachable",
            PersistenceReason::FileNotFound => "file_not_found",
            PersistenceReason::InvalidSnapshot => "invalid_snapshot",
        }
    }
}

impl fmt::Display for PersistenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dump/load failure, carrying the engine-supplied reason unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("persistence failed: {reason}")]
pub struct PersistenceError {
    pub reason: PersistenceReason,
}

impl From<PersistenceReason> for PersistenceError {
    fn from(reason: PersistenceReason) -> Self {
        Self { reason }
    }
}

// == Engine Error ==
/// Failures raised by the cache engine itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The request violates an engine limit (key length, invalid ttl, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Capacity reached and the eviction policy refuses to make room
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Counter operation on a value that is not an integer
    #[error("Value at key '{0}' is not an integer counter")]
    NotACounter(String),

    /// Malformed predicate or projection
    #[error("Bad match spec: {0}")]
    BadMatchSpec(String),

    /// Transactional lock over the key set could not be acquired in time
    #[error("Timed out acquiring lock on keys {0:?}")]
    LockTimeout(Vec<String>),
}

// == Cache Error Enum ==
/// Unified error type returned by the adapter operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Invalid request data at the HTTP boundary
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found (HTTP boundary only, the adapter reports absence as `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// A blocking engine call panicked or was cancelled
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Query(_) => StatusCode::BAD_REQUEST,
            CacheError::Persistence(err) => match err.reason {
                PersistenceReason::FileNotFound => StatusCode::NOT_FOUND,
                PersistenceReason::FileUnreachable => StatusCode::INTERNAL_SERVER_ERROR,
                PersistenceReason::InvalidSnapshot => StatusCode::UNPROCESSABLE_ENTITY,
            },
            CacheError::Engine(EngineError::CacheFull(_)) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Engine(EngineError::LockTimeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Engine(EngineError::NotACounter(_)) => StatusCode::CONFLICT,
            CacheError::Engine(_) => StatusCode::BAD_REQUEST,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache bridge.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_query_error_names_operation() {
        let err = QueryError::unsupported("count_all", Some("key > 3"));
        assert_eq!(err.operation, "count_all");
        assert!(err.to_string().contains("unsupported operation: count_all"));
    }

    #[test]
    fn test_persistence_reason_strings() {
        assert_eq!(PersistenceReason::FileUnreachable.as_str(), "file_unreachable");
        assert_eq!(PersistenceReason::FileNotFound.as_str(), "file_not_found");
    }

    #[test]
    fn test_engine_error_converts_into_cache_error() {
        let err: CacheError = EngineError::NotACounter("k".to_string()).into();
        assert!(matches!(err, CacheError::Engine(EngineError::NotACounter(_))));
    }

    #[test]
    fn test_persistence_error_status() {
        let err = CacheError::from(PersistenceError::from(PersistenceReason::FileNotFound));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
