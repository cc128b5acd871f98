//! Adapter Module
//!
//! Exposes the generic cache contract on top of the engine: write policies,
//! counters, queries, streams, snapshots and stats.
//!
//! Every operation goes through a [`CacheHandle`], so several engine
//! instances can run side by side in one process.

mod counter;
mod persistence;
mod query;
mod stream;
mod ttl;
mod write;


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::engine::{Engine, EngineConfig};
use crate::error::Result;

pub use persistence::{Measurements, Metadata, Stats};
pub use query::{Entry, Operation, Projected, Query, QueryOutcome, QuerySpec, ReturnShape};
pub use stream::{QueryStream, StreamCursor, StreamOptions, DEFAULT_PAGE_SIZE};
pub use ttl::Ttl;
pub use write::WritePolicy;

// == Cache Handle ==
/// Reference to one running engine instance.
///
/// Cloning is cheap; all clones address the same engine. The handle never
/// owns engine state beyond keeping the instance alive.
#[derive(Debug, Clone)]
pub struct CacheHandle {
    engine: Arc<Engine>,
    name: Arc<str>,
    stats: bool,
}

impl CacheHandle {
    // == Constructor ==
    /// Starts a fresh engine from configuration and returns its handle.
    pub fn start(config: &Config) -> Self {
        let engine = Engine::new(EngineConfig {
            name: config.name.clone(),
            stats: config.stats,
            max_entries: (config.max_entries > 0).then_some(config.max_entries),
            eviction: config.eviction,
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        });
        Self::from_engine(Arc::new(engine))
    }

    /// Wraps an already running engine.
    pub fn from_engine(engine: Arc<Engine>) -> Self {
        Self {
            name: Arc::from(engine.name()),
            stats: engine.stats_enabled(),
            engine,
        }
    }

    /// Display name of the engine instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stats_enabled(&self) -> bool {
        self.stats
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    // == Reads ==
    /// Returns the value at `key`, None if absent or expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.engine.get(key)
    }

    /// Returns the present keys among `keys` with their values.
    pub fn get_all<I, K>(&self, keys: I) -> HashMap<String, Value>
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.engine.get_many(&keys).into_iter().collect()
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.engine.exists(key)
    }

    /// Remaining TTL of `key`, None if the key is missing.
    pub fn ttl(&self, key: &str) -> Option<Ttl> {
        self.engine.ttl(key).map(Ttl::from_engine)
    }

    // == Removal ==
    /// Removes `key`. Deleting a missing key is not an error.
    pub fn delete(&self, key: &str) {
        let removed = self.engine.delete(key);
        debug!("DELETE key={} removed={}", key, removed);
    }

    /// Removes `key` and returns its value in the same engine call.
    pub fn take(&self, key: &str) -> Option<Value> {
        self.engine.take(key)
    }

    // == Expiration ==
    /// Sets a new TTL on `key`. Returns false if the key is missing.
    pub fn expire(&self, key: &str, ttl: Ttl) -> Result<bool> {
        let ttl = ttl::engine_ttl(ttl)?;
        Ok(self.engine.expire(key, ttl))
    }

    /// Restarts the TTL of `key`. Returns false if the key is missing.
    pub fn touch(&self, key: &str) -> bool {
        self.engine.touch(key)
    }
}
