//! Persistence Bridge and Stats Reporter
//!
//! Thin translations of the engine's snapshot and telemetry results.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::CacheHandle;
use crate::engine::EngineStats;
use crate::error::{PersistenceError, Result};

// == Stats ==
/// Numeric measurements reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Measurements {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub updates: u64,
    pub deletions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl Measurements {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Engine metadata reported next to the measurements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub measurements: Measurements,
    pub metadata: Metadata,
}

impl From<EngineStats> for Stats {
    fn from(raw: EngineStats) -> Self {
        Self {
            metadata: Metadata {
                created_at: i64::try_from(raw.created_at)
                    .ok()
                    .and_then(DateTime::<Utc>::from_timestamp_millis),
                name: raw.name,
            },
            measurements: Measurements {
                hits: raw.hits,
                misses: raw.misses,
                writes: raw.writes,
                updates: raw.updates,
                deletions: raw.deletions,
                evictions: raw.evictions,
                expirations: raw.expirations,
            },
        }
    }
}

impl CacheHandle {
    // == Dump ==
    /// Writes a snapshot of the live entries to `path`.
    pub fn dump(&self, path: impl AsRef<Path>) -> Result<()> {
        self.engine
            .dump(path.as_ref())
            .map(|_| ())
            .map_err(|reason| PersistenceError::from(reason).into())
    }

    // == Load ==
    /// Restores entries from a snapshot at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        self.engine
            .load(path.as_ref())
            .map(|_| ())
            .map_err(|reason| PersistenceError::from(reason).into())
    }

    // == Stats ==
    /// Measurements and metadata, None if stats were disabled at start.
    pub fn stats(&self) -> Option<Stats> {
        if !self.stats {
            return None;
        }
        self.engine.stats().map(Stats::from)
    }
}
