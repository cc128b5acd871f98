//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{ReturnShape, Ttl, WritePolicy};
use crate::engine::MAX_KEY_LENGTH;

/// Resolves the optional `ttl` (seconds) and `ttl_ms` fields of a request.
///
/// `ttl_ms` wins when both are given; neither means no expiration.
fn resolve_ttl(secs: Option<u64>, millis: Option<u64>) -> Ttl {
    match (millis, secs) {
        (Some(ms), _) => Ttl::from_millis(ms),
        (None, Some(secs)) => Ttl::from_secs(secs),
        (None, None) => Ttl::Infinite,
    }
}

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON value
/// - `ttl` / `ttl_ms`: Optional TTL in seconds or milliseconds
/// - `policy`: `insert` (default), `replace` or `insert_if_absent`
/// - `locked`: run `insert_if_absent` inside the key lock instead of the
///   plain check-then-write
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub policy: WritePolicy,
    #[serde(default)]
    pub locked: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.locked && self.policy != WritePolicy::InsertIfAbsent {
            return Some("locked only applies to insert_if_absent".to_string());
        }
        validate_key(&self.key)
    }

    pub fn ttl(&self) -> Ttl {
        resolve_ttl(self.ttl, self.ttl_ms)
    }
}

/// Request body for POST /expire
#[derive(Debug, Clone, Deserialize)]
pub struct ExpireRequest {
    pub key: String,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl ExpireRequest {
    pub fn ttl(&self) -> Ttl {
        resolve_ttl(self.ttl, self.ttl_ms)
    }
}

fn default_amount() -> i64 {
    1
}

/// Request body for POST /counter
///
/// A missing counter starts from `default` before `amount` is applied.
#[derive(Debug, Clone, Deserialize)]
pub struct CounterRequest {
    pub key: String,
    #[serde(default = "default_amount")]
    pub amount: i64,
    #[serde(default)]
    pub default: i64,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

impl CounterRequest {
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key)
    }

    pub fn ttl(&self) -> Ttl {
        resolve_ttl(self.ttl, self.ttl_ms)
    }
}

/// Query string for GET /keys
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeysParams {
    /// Rows fetched per engine call
    #[serde(default)]
    pub page_size: Option<usize>,
    /// Result shape, keys only by default
    #[serde(default)]
    pub shape: Option<ReturnShape>,
    /// List expired entries instead of live ones
    #[serde(default)]
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"n": 1}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"n": 1}));
        assert_eq!(req.policy, WritePolicy::Insert);
        assert_eq!(req.ttl(), Ttl::Infinite);
    }

    #[test]
    fn test_set_request_with_ttl_and_policy() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60, "policy": "insert_if_absent"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Ttl::Finite(Duration::from_secs(60)));
        assert_eq!(req.policy, WritePolicy::InsertIfAbsent);
    }

    #[test]
    fn test_ttl_ms_wins_over_seconds() {
        let json = r#"{"key": "k", "ttl": 60, "ttl_ms": 250}"#;
        let req: ExpireRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl(), Ttl::from_millis(250));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let json = r#"{"key": "k", "value": 1, "policy": "upsert"}"#;
        assert!(serde_json::from_str::<SetRequest>(json).is_err());
    }

    #[test]
    fn test_counter_request_defaults() {
        let req: CounterRequest = serde_json::from_str(r#"{"key": "hits"}"#).unwrap();
        assert_eq!(req.amount, 1);
        assert_eq!(req.default, 0);
        assert_eq!(req.ttl(), Ttl::Infinite);
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
            ttl_ms: None,
            policy: WritePolicy::Insert,
            locked: false,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_locked_needs_insert_if_absent() {
        let json = r#"{"key": "k", "value": 1, "locked": true}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_some());

        let json = r#"{"key": "k", "value": 1, "locked": true, "policy": "insert_if_absent"}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_long_key() {
        let req = CounterRequest {
            key: "k".repeat(MAX_KEY_LENGTH + 1),
            amount: 1,
            default: 0,
            ttl: None,
            ttl_ms: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_keys_params_shape() {
        let params: KeysParams =
            serde_json::from_str(r#"{"shape": "key_value", "page_size": 5}"#).unwrap();
        assert_eq!(params.shape, Some(ReturnShape::KeyValue));
        assert_eq!(params.page_size, Some(5));
        assert!(!params.expired);
    }
}
