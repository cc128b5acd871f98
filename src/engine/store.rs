//! Engine Store Module
//!
//! The in-process cache engine: ordered storage with passive TTL expiration,
//! optional LRU eviction, counters, key-set transactions and a resumable
//! cursor over match specs.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::str::FromStr;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::entry::{current_timestamp_ms, EngineEntry};
use super::locks::KeyLocks;
use super::lru::LruTracker;
use super::matcher::{MatchSpec, Row};
use super::stats::EngineStats;
use super::MAX_KEY_LENGTH;
use crate::error::EngineError;

// == Eviction Policy ==
/// What the engine does when a new key would exceed `max_entries`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Evict the least recently used entry
    #[default]
    Lru,
    /// Refuse the write
    Reject,
}

impl FromStr for EvictionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionPolicy::Lru),
            "reject" | "none" => Ok(EvictionPolicy::Reject),
            other => Err(format!("unknown eviction policy '{}'", other)),
        }
    }
}

// == Engine Config ==
/// Options consumed by the engine itself.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Instance name
    pub name: String,
    /// Whether aggregate counters are recorded
    pub stats: bool,
    /// Entry limit, None = unbounded
    pub max_entries: Option<usize>,
    /// Behaviour at the entry limit
    pub eviction: EvictionPolicy,
    /// Upper bound on waiting for a key-set lock
    pub lock_timeout: Duration,
}

impl EngineConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stats: false,
            max_entries: None,
            eviction: EvictionPolicy::Lru,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

// == Page ==
/// One batch returned by the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Key to resume after, None once the scan is exhausted
    pub continuation: Option<String>,
}

#[derive(Debug)]
pub(super) struct Inner {
    pub(super) entries: BTreeMap<String, EngineEntry>,
    lru: LruTracker,
    stats: EngineStats,
}

// == Engine ==
/// Internally synchronized cache engine.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    pub(super) inner: RwLock<Inner>,
    locks: KeyLocks,
}

impl Engine {
    // == Constructor ==
    /// Starts an empty engine instance.
    pub fn new(config: EngineConfig) -> Self {
        let stats = EngineStats::new(config.name.clone(), current_timestamp_ms());
        Self {
            locks: KeyLocks::new(config.lock_timeout),
            inner: RwLock::new(Inner {
                entries: BTreeMap::new(),
                lru: LruTracker::new(),
                stats,
            }),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn stats_enabled(&self) -> bool {
        self.config.stats
    }

    // == Get ==
    /// Returns the live value at `key`; expired entries are dropped lazily.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.write();
        let value = inner.read_live(key);
        if self.config.stats {
            match value {
                Some(_) => inner.stats.record_hit(),
                None => inner.stats.record_miss(),
            }
        }
        value
    }

    /// Returns the live values among `keys`, absent keys are skipped.
    pub fn get_many(&self, keys: &[String]) -> Vec<(String, Value)> {
        let mut inner = self.inner.write();
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            match inner.read_live(key) {
                Some(value) => {
                    if self.config.stats {
                        inner.stats.record_hit();
                    }
                    found.push((key.clone(), value));
                }
                None if self.config.stats => inner.stats.record_miss(),
                None => {}
            }
        }
        found
    }

    // == Put ==
    /// Stores `value` unconditionally, restarting its TTL.
    pub fn put(&self, key: String, value: Value, ttl: Option<u64>) -> Result<(), EngineError> {
        debug!("PUT key={}, ttl={:?}", key, ttl);
        validate_key(&key)?;
        let mut inner = self.inner.write();
        self.make_room(&mut inner, std::slice::from_ref(&key))?;
        inner.insert(key, EngineEntry::new(value, ttl), self.config.stats);
        Ok(())
    }

    /// Stores every pair with the same TTL.
    pub fn put_many(&self, entries: Vec<(String, Value)>, ttl: Option<u64>) -> Result<(), EngineError> {
        debug!("PUT_MANY count={}, ttl={:?}", entries.len(), ttl);
        for (key, _) in &entries {
            validate_key(key)?;
        }
        let mut inner = self.inner.write();
        let keys: Vec<String> = entries.iter().map(|(k, _)| k.clone()).collect();
        self.make_room(&mut inner, &keys)?;
        for (key, value) in entries {
            inner.insert(key, EngineEntry::new(value, ttl), self.config.stats);
        }
        Ok(())
    }

    // == Update ==
    /// Replaces the value of a live entry. Returns false if the key is absent.
    pub fn update(&self, key: &str, value: Value, ttl: Option<u64>) -> bool {
        let mut inner = self.inner.write();
        if !inner.is_live(key) {
            return false;
        }
        inner.insert(key.to_string(), EngineEntry::new(value, ttl), self.config.stats);
        true
    }

    // == Exists ==
    pub fn exists(&self, key: &str) -> bool {
        self.inner.read().is_live(key)
    }

    // == Delete ==
    /// Removes an entry. Returns whether anything was stored under `key`.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        let removed = inner.remove(key).is_some();
        if removed && self.config.stats {
            inner.stats.record_deletions(1);
        }
        removed
    }

    // == Take ==
    /// Removes and returns the live value at `key` under one write lock.
    pub fn take(&self, key: &str) -> Option<Value> {
        let mut inner = self.inner.write();
        let now = current_timestamp_ms();
        let entry = inner.remove(key)?;
        if entry.is_expired_at(now) {
            if self.config.stats {
                inner.stats.record_expirations(1);
                inner.stats.record_miss();
            }
            return None;
        }
        if self.config.stats {
            inner.stats.record_hit();
            inner.stats.record_deletions(1);
        }
        Some(entry.value)
    }

    // == TTL ==
    /// Remaining TTL: None if missing, Some(None) if it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<u64>> {
        let inner = self.inner.read();
        let now = current_timestamp_ms();
        let entry = inner.entries.get(key).filter(|e| !e.is_expired_at(now))?;
        Some(entry.ttl_remaining_at(now))
    }

    // == Expire ==
    /// Sets a new TTL counted from now. Returns false if the key is absent.
    pub fn expire(&self, key: &str, ttl: Option<u64>) -> bool {
        let mut inner = self.inner.write();
        let stats = self.config.stats;
        let now = current_timestamp_ms();
        match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.ttl = ttl;
                entry.touch();
                if stats {
                    inner.stats.record_update();
                }
                true
            }
            _ => false,
        }
    }

    // == Touch ==
    /// Restarts the TTL of a live entry.
    pub fn touch(&self, key: &str) -> bool {
        let mut inner = self.inner.write();
        let now = current_timestamp_ms();
        match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.touch();
                inner.lru.touch(key);
                true
            }
            _ => false,
        }
    }

    // == Increment ==
    /// Adds `amount` to the counter at `key`, creating it at `default` first
    /// if absent. Existing entries keep their TTL.
    pub fn incr(&self, key: &str, amount: i64, default: i64) -> Result<i64, EngineError> {
        validate_key(key)?;
        let mut inner = self.inner.write();
        let now = current_timestamp_ms();
        let stats = self.config.stats;

        if let Some(entry) = inner.entries.get_mut(key).filter(|e| !e.is_expired_at(now)) {
            let current = entry
                .value
                .as_i64()
                .ok_or_else(|| EngineError::NotACounter(key.to_string()))?;
            let next = checked_add(key, current, amount)?;
            entry.value = Value::from(next);
            inner.lru.touch(key);
            if stats {
                inner.stats.record_update();
            }
            return Ok(next);
        }

        let next = checked_add(key, default, amount)?;
        self.make_room(&mut inner, &[key.to_string()])?;
        inner.insert(key.to_string(), EngineEntry::new(Value::from(next), None), stats);
        Ok(next)
    }

    // == Size ==
    /// Number of live entries.
    pub fn size(&self) -> usize {
        let now = current_timestamp_ms();
        self.inner
            .read()
            .entries
            .values()
            .filter(|e| !e.is_expired_at(now))
            .count()
    }

    // == Clear ==
    /// Removes every stored entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.entries.len();
        inner.entries.clear();
        inner.lru.clear();
        if self.config.stats {
            inner.stats.record_deletions(count);
        }
        count
    }

    // == Purge Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write();
        inner.purge_expired_at(current_timestamp_ms(), self.config.stats)
    }

    // == Cursor ==
    /// Scans entries in key order after `after`, returning up to `limit`
    /// projected rows matching `spec`.
    ///
    /// Expired entries are invisible unless the predicate mentions the
    /// `expired` selector.
    pub fn select_page(
        &self,
        spec: &MatchSpec,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Page, EngineError> {
        if limit == 0 {
            return Err(EngineError::InvalidRequest("page limit must be positive".to_string()));
        }
        spec.validate()?;

        let now = current_timestamp_ms();
        let include_expired = spec.selects_expired();
        let lower = match after {
            Some(key) => Bound::Excluded(key),
            None => Bound::Unbounded,
        };

        let inner = self.inner.read();
        let mut rows = Vec::new();
        let mut last: Option<&String> = None;

        for (key, entry) in inner.entries.range::<str, _>((lower, Bound::Unbounded)) {
            if rows.len() == limit {
                return Ok(Page {
                    rows,
                    continuation: last.cloned(),
                });
            }
            last = Some(key);
            if !include_expired && entry.is_expired_at(now) {
                continue;
            }
            if spec.matches(key, entry, now)? {
                rows.push(spec.project(key, entry));
            }
        }

        Ok(Page {
            rows,
            continuation: None,
        })
    }

    // == Transaction ==
    /// Runs `f` while holding the lock over exactly `keys`.
    ///
    /// Only callers that go through this method are excluded from each
    /// other; plain writes do not consult the lock registry.
    pub fn transaction<T, E>(
        &self,
        keys: &[String],
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<EngineError>,
    {
        let _guard = self.locks.acquire(keys)?;
        f()
    }

    // == Stats ==
    /// Aggregate counters, None when stats are disabled.
    pub fn stats(&self) -> Option<EngineStats> {
        if !self.config.stats {
            return None;
        }
        Some(self.inner.read().stats.clone())
    }

    /// Ensures the keys not yet stored fit, evicting or rejecting.
    ///
    /// Expired entries are dropped before any live entry is evicted or the
    /// write is rejected.
    fn make_room(&self, inner: &mut Inner, keys: &[String]) -> Result<(), EngineError> {
        let Some(max) = self.config.max_entries else {
            return Ok(());
        };
        if inner.entries.len() + inner.missing(keys) <= max {
            return Ok(());
        }
        inner.purge_expired_at(current_timestamp_ms(), self.config.stats);

        // Eviction may drop a batch key that was already stored, so the
        // missing count is taken again on every pass
        while inner.entries.len() + inner.missing(keys) > max {
            match self.config.eviction {
                EvictionPolicy::Reject => {
                    return Err(EngineError::CacheFull(format!(
                        "limit of {} entries reached",
                        max
                    )));
                }
                EvictionPolicy::Lru => {
                    let victim = inner.lru.evict_oldest().ok_or_else(|| {
                        EngineError::CacheFull("Cache is full and eviction failed".to_string())
                    })?;
                    inner.entries.remove(&victim);
                    if self.config.stats {
                        inner.stats.record_eviction();
                    }
                    debug!("Evicted key={}", victim);
                }
            }
        }
        Ok(())
    }
}

impl Inner {
    fn is_live(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    /// Reads a live value, removing the entry if it expired.
    fn read_live(&mut self, key: &str) -> Option<Value> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.remove(key);
            self.stats.record_expirations(1);
            return None;
        }
        self.lru.touch(key);
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub(super) fn insert(&mut self, key: String, entry: EngineEntry, stats: bool) {
        self.lru.touch(&key);
        let previous = self.entries.insert(key, entry);
        if stats {
            let overwrite = previous.is_some_and(|p| !p.is_expired());
            self.stats.record_write(overwrite);
        }
    }

    fn remove(&mut self, key: &str) -> Option<EngineEntry> {
        self.lru.remove(key);
        self.entries.remove(key)
    }

    /// Number of distinct `keys` with no stored entry.
    fn missing(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|k| !self.entries.contains_key(k.as_str()))
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn purge_expired_at(&mut self, now: u64, stats: bool) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        if stats {
            self.stats.record_expirations(expired.len());
        }
        expired.len()
    }
}

fn validate_key(key: &str) -> Result<(), EngineError> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(EngineError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn checked_add(key: &str, current: i64, amount: i64) -> Result<i64, EngineError> {
    current
        .checked_add(amount)
        .ok_or_else(|| EngineError::InvalidRequest(format!("counter overflow at key '{}'", key)))
}
