//! Write Coordinator
//!
//! Maps write policies onto the engine's unconditional writes, existence
//! checks and key-set transactions.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::ttl::{engine_ttl, Ttl};
use super::CacheHandle;
use crate::error::Result;

// == Write Policy ==
/// How a write treats an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Insert or overwrite
    #[default]
    Insert,
    /// Overwrite only if the key is present
    Replace,
    /// Insert only if the key is absent
    InsertIfAbsent,
}

impl CacheHandle {
    // == Put ==
    /// Writes one entry according to `policy`.
    ///
    /// # Returns
    /// - `Insert`: always `true`
    /// - `Replace`: whether an existing entry was updated
    /// - `InsertIfAbsent`: whether the value was stored
    ///
    /// `InsertIfAbsent` is an existence check followed by a plain write and is
    /// NOT atomic: a concurrent writer may store the key between the two calls
    /// and its value will be overwritten. Use [`CacheHandle::put_new_locked`]
    /// or a one-entry [`CacheHandle::put_all`] when that matters.
    pub fn put(
        &self,
        key: impl Into<String>,
        value: Value,
        ttl: Ttl,
        policy: WritePolicy,
    ) -> Result<bool> {
        let key = key.into();
        let ttl = engine_ttl(ttl)?;

        match policy {
            WritePolicy::Insert => {
                self.engine.put(key, value, ttl)?;
                Ok(true)
            }
            WritePolicy::Replace => Ok(self.engine.update(&key, value, ttl)),
            WritePolicy::InsertIfAbsent => {
                if self.engine.exists(&key) {
                    debug!("PUT_NEW key={} skipped, key exists", key);
                    return Ok(false);
                }
                self.engine.put(key, value, ttl)?;
                Ok(true)
            }
        }
    }

    /// Insert-if-absent for one key inside the engine's key lock.
    ///
    /// Excludes other transactional writers of the same key (bulk
    /// `InsertIfAbsent`, counters with a TTL); plain writes still race.
    pub fn put_new_locked(&self, key: impl Into<String>, value: Value, ttl: Ttl) -> Result<bool> {
        let key = key.into();
        let ttl = engine_ttl(ttl)?;
        let keys = [key.clone()];

        self.engine.transaction(&keys, || -> Result<bool> {
            if self.engine.exists(&key) {
                return Ok(false);
            }
            self.engine.put(key, value, ttl)?;
            Ok(true)
        })
    }

    // == Put All ==
    /// Writes a batch of entries with one TTL according to `policy`.
    ///
    /// `InsertIfAbsent` and `Replace` are all-or-nothing: the batch's keys are
    /// locked, every key is checked, and the batch is written only if every
    /// key is absent (resp. present). Returns whether the batch was written.
    pub fn put_all<I, K>(&self, entries: I, ttl: Ttl, policy: WritePolicy) -> Result<bool>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries: Vec<(String, Value)> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let ttl = engine_ttl(ttl)?;

        if entries.is_empty() {
            return Ok(true);
        }

        let required_presence = match policy {
            WritePolicy::Insert => {
                self.engine.put_many(entries, ttl)?;
                return Ok(true);
            }
            WritePolicy::Replace => true,
            WritePolicy::InsertIfAbsent => false,
        };

        let keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
        self.engine.transaction(&keys, || -> Result<bool> {
            if keys.iter().any(|k| self.engine.exists(k) != required_presence) {
                debug!("PUT_ALL {:?} rejected for {} keys", policy, keys.len());
                return Ok(false);
            }
            self.engine.put_many(entries, ttl)?;
            Ok(true)
        })
    }
}
