//! Snapshot Module
//!
//! Dumps live entries to a JSON file and loads them back.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::entry::{current_timestamp_ms, EngineEntry};
use super::store::Engine;
use crate::error::PersistenceReason;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    name: String,
    dumped_at: u64,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    value: Value,
    touched_at: u64,
    ttl: Option<u64>,
}

impl Engine {
    // == Dump ==
    /// Writes every live entry to `path`, replacing any existing file.
    pub fn dump(&self, path: &Path) -> Result<bool, PersistenceReason> {
        let now = current_timestamp_ms();
        let entries: Vec<SnapshotEntry> = self
            .inner
            .read()
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| SnapshotEntry {
                key: key.clone(),
                value: entry.value.clone(),
                touched_at: entry.touched_at,
                ttl: entry.ttl,
            })
            .collect();

        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            name: self.name().to_string(),
            dumped_at: now,
            entries,
        };

        let file = File::create(path).map_err(|err| unreachable_reason(path, err))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)
            .map_err(|err| unreachable_reason(path, err.into()))?;
        writer.flush().map_err(|err| unreachable_reason(path, err))?;

        info!("Dumped {} entries to {:?}", snapshot.entries.len(), path);
        Ok(true)
    }

    // == Load ==
    /// Restores entries from `path`, keeping their touch time and TTL.
    ///
    /// Entries that expired since the dump are skipped. Loaded entries
    /// overwrite live entries with the same key.
    pub fn load(&self, path: &Path) -> Result<bool, PersistenceReason> {
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => PersistenceReason::FileNotFound,
            _ => unreachable_reason(path, err),
        })?;

        let snapshot: SnapshotFile = serde_json::from_reader(BufReader::new(file)).map_err(|err| {
            warn!("Snapshot {:?} could not be decoded: {}", path, err);
            if err.is_io() {
                PersistenceReason::FileUnreachable
            } else {
                PersistenceReason::InvalidSnapshot
            }
        })?;

        let now = current_timestamp_ms();
        let stats = self.stats_enabled();
        let mut inner = self.inner.write();
        let mut loaded = 0usize;
        for item in snapshot.entries {
            let entry = EngineEntry {
                value: item.value,
                touched_at: item.touched_at,
                ttl: item.ttl,
            };
            if entry.is_expired_at(now) {
                continue;
            }
            inner.insert(item.key, entry, stats);
            loaded += 1;
        }

        info!("Loaded {} entries from {:?}", loaded, path);
        Ok(true)
    }
}

fn unreachable_reason(path: &Path, err: io::Error) -> PersistenceReason {
    warn!("Snapshot file {:?} unreachable: {}", path, err);
    PersistenceReason::FileUnreachable
}
