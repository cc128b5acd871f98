//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::adapter::{Projected, Stats, Ttl};

/// Response body for GET /get/:key and POST /take/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Outcome message
    pub message: String,
    /// The key that was targeted
    pub key: String,
    /// Whether the write policy let the value through
    pub written: bool,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, written: bool) -> Self {
        let key = key.into();
        let message = if written {
            format!("Key '{}' set successfully", key)
        } else {
            format!("Key '{}' left unchanged", key)
        };
        Self {
            message,
            key,
            written,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted", key),
            key,
        }
    }
}

/// Response body for GET /ttl/:key
///
/// `ttl` is `"infinity"` or the remaining milliseconds.
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    pub ttl: Ttl,
}

/// Response body for POST /expire
#[derive(Debug, Clone, Serialize)]
pub struct ExpireResponse {
    pub key: String,
    /// False when the key was missing
    pub updated: bool,
}

/// Response body for POST /counter
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: i64,
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub results: Vec<Projected>,
}

impl KeysResponse {
    pub fn new(results: Vec<Projected>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Response body for GET /count and POST /purge
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Response body for POST /dump and POST /load
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub message: String,
    pub path: String,
}

/// Response body for the stats endpoint (GET /stats)
///
/// `stats` is null when the engine runs with stats disabled.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub name: String,
    /// Current number of live entries
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: Option<f64>,
    pub stats: Option<Stats>,
}

impl StatsResponse {
    pub fn new(name: impl Into<String>, total_entries: usize, stats: Option<Stats>) -> Self {
        Self {
            name: name.into(),
            total_entries,
            hit_rate: stats.as_ref().map(|s| s.measurements.hit_rate()),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
