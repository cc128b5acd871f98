//! Configuration Module
//!
//! Handles loading the engine instance and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::EvictionPolicy;

/// Engine instance and server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine instance name
    pub name: String,
    /// Whether the engine records aggregate stats
    pub stats: bool,
    /// Maximum number of entries, 0 = unbounded
    pub max_entries: usize,
    /// What happens when `max_entries` is reached
    pub eviction: EvictionPolicy,
    /// Expired entry sweep interval in seconds, 0 disables the janitor
    pub sweep_interval: u64,
    /// Upper bound on waiting for a transactional key lock, in milliseconds
    pub lock_timeout_ms: u64,
    /// Snapshot file used by the dump/load endpoints
    pub snapshot_path: PathBuf,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_NAME` - Engine instance name (default: cache_bridge)
    /// - `STATS_ENABLED` - Record stats (default: true)
    /// - `MAX_ENTRIES` - Maximum cache entries, 0 = unbounded (default: 10000)
    /// - `EVICTION_POLICY` - `lru` or `reject` (default: lru)
    /// - `SWEEP_INTERVAL` - Expired entry sweep in seconds (default: 1)
    /// - `LOCK_TIMEOUT_MS` - Key lock wait bound (default: 5000)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: cache_bridge.snapshot.json)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            name: env::var("CACHE_NAME").unwrap_or(defaults.name),
            stats: parse_var("STATS_ENABLED").unwrap_or(defaults.stats),
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            eviction: parse_var("EVICTION_POLICY").unwrap_or(defaults.eviction),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            lock_timeout_ms: parse_var("LOCK_TIMEOUT_MS").unwrap_or(defaults.lock_timeout_ms),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_path),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "cache_bridge".to_string(),
            stats: true,
            max_entries: 10_000,
            eviction: EvictionPolicy::Lru,
            sweep_interval: 1,
            lock_timeout_ms: 5_000,
            snapshot_path: PathBuf::from("cache_bridge.snapshot.json"),
            server_port: 3000,
        }
    }
}
