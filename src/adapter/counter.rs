//! Counter Coordinator
//!
//! Atomic increments, optionally paired with a new expiration.

use tracing::debug;

use super::ttl::{engine_ttl, Ttl};
use super::CacheHandle;
use crate::error::Result;

impl CacheHandle {
    // == Update Counter ==
    /// Adds `amount` to the integer at `key`, creating it at `default` first
    /// if absent, and returns the new value.
    ///
    /// With a finite `ttl` the increment and the expiration update run inside
    /// one key lock, so other transactional callers never observe the counter
    /// without its new expiration. Plain writes do not take that lock: a plain
    /// delete landing between the two steps leaves no entry behind, and the
    /// incremented value is still returned.
    pub fn update_counter(&self, key: &str, amount: i64, ttl: Ttl, default: i64) -> Result<i64> {
        let Some(ttl_ms) = engine_ttl(ttl)? else {
            return Ok(self.engine.incr(key, amount, default)?);
        };

        let keys = [key.to_string()];
        self.engine.transaction(&keys, || -> Result<i64> {
            let value = self.engine.incr(key, amount, default)?;
            if self.engine.expire(key, Some(ttl_ms)) {
                debug!("INCR key={} value={} ttl_ms={}", key, value, ttl_ms);
            } else {
                debug!("INCR key={} value={} removed before ttl applied", key, value);
            }
            Ok(value)
        })
    }
}
