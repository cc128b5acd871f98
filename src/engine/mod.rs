//! Engine Module
//!
//! The cache engine the adapter calls into. It owns storage, expiration,
//! eviction, counters, key-set locks, the cursor and snapshots.

mod entry;
mod locks;
mod lru;
mod matcher;
mod snapshot;
mod stats;
mod store;

// Re-export public types
pub use entry::{current_timestamp_ms, EngineEntry};
pub use locks::{KeyLockGuard, KeyLocks};
pub use lru::LruTracker;
pub use matcher::{Expr, Field, MatchSpec, Row};
pub use stats::EngineStats;
pub use store::{Engine, EngineConfig, EvictionPolicy, Page};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
