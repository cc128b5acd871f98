//! Engine Statistics Module
//!
//! Aggregate counters the engine keeps when stats are enabled.

use serde::Serialize;

// == Engine Stats ==
/// Raw counters plus instance metadata, as reported by the engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    /// Instance name the engine was started with
    pub name: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Successful reads
    pub hits: u64,
    /// Reads of absent or expired keys
    pub misses: u64,
    /// New entries written
    pub writes: u64,
    /// Existing entries overwritten, replaced, re-expired or incremented
    pub updates: u64,
    /// Entries removed explicitly
    pub deletions: u64,
    /// Entries removed by the eviction policy
    pub evictions: u64,
    /// Entries removed because their TTL elapsed
    pub expirations: u64,
}

impl EngineStats {
    // == Constructor ==
    /// Creates zeroed counters for the named instance.
    pub fn new(name: impl Into<String>, created_at: u64) -> Self {
        Self {
            name: name.into(),
            created_at,
            ..Self::default()
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Records a write, split by whether the key already held a live entry.
    pub fn record_write(&mut self, overwrite: bool) {
        if overwrite {
            self.updates += 1;
        } else {
            self.writes += 1;
        }
    }

    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    pub fn record_deletions(&mut self, count: usize) {
        self.deletions += count as u64;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_new() {
        let stats = EngineStats::new("cache", 42);
        assert_eq!(stats.name, "cache");
        assert_eq!(stats.created_at, 42);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.writes, 0);
    }

    #[test]
    fn test_record_write_splits_overwrites() {
        let mut stats = EngineStats::default();
        stats.record_write(false);
        stats.record_write(true);
        stats.record_write(true);
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.updates, 2);
    }

    #[test]
    fn test_record_bulk_counters() {
        let mut stats = EngineStats::default();
        stats.record_deletions(3);
        stats.record_expirations(2);
        stats.record_eviction();
        assert_eq!(stats.deletions, 3);
        assert_eq!(stats.expirations, 2);
        assert_eq!(stats.evictions, 1);
    }
}
