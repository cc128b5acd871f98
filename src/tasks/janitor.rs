//! Expired Entry Janitor
//!
//! Background task that periodically purges expired entries through the
//! adapter's `delete_all(Expired)` operation.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::{CacheHandle, Query};

/// Spawns a background task that periodically purges expired entries.
///
/// Expiration itself is passive: an expired entry is already invisible to
/// reads, the janitor only reclaims its memory.
///
/// # Arguments
/// * `cache` - Handle to the engine instance to sweep
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = CacheHandle::start(&Config::default());
/// let janitor = spawn_janitor(cache.clone(), 1);
/// // Later, during shutdown:
/// janitor.abort();
/// ```
pub fn spawn_janitor(cache: CacheHandle, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting janitor for {} with interval of {} seconds",
            cache.name(),
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match cache.delete_all(&Query::Expired) {
                Ok(0) => debug!("Janitor: no expired entries found"),
                Ok(removed) => info!("Janitor: removed {} expired entries", removed),
                Err(err) => warn!("Janitor sweep failed: {}", err),
            }
        }
    })
}
