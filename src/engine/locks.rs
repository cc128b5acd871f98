//! Key Lock Module
//!
//! Scoped locks over a set of keys, the engine's transaction primitive.
//! A set is acquired all at once or not at all, so two transactions never
//! hold part of each other's keys. Locks are not re-entrant.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::error::EngineError;

// == Key Locks ==
/// Registry of keys currently held by a transaction.
#[derive(Debug)]
pub struct KeyLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
    timeout: Duration,
}

impl KeyLocks {
    /// Creates a registry whose acquisitions give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    // == Acquire ==
    /// Blocks until none of `keys` is held, then holds all of them.
    ///
    /// The returned guard releases the keys when dropped.
    pub fn acquire(&self, keys: &[String]) -> Result<KeyLockGuard<'_>, EngineError> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        let deadline = Instant::now() + self.timeout;
        let mut held = self.held.lock();

        while keys.iter().any(|k| held.contains(k)) {
            if self.released.wait_until(&mut held, deadline).timed_out()
                && keys.iter().any(|k| held.contains(k))
            {
                warn!("Lock wait timed out for keys {:?}", keys);
                return Err(EngineError::LockTimeout(keys));
            }
        }

        held.extend(keys.iter().cloned());
        debug!("Locked keys {:?}", keys);

        Ok(KeyLockGuard { locks: self, keys })
    }

    /// Whether `key` is currently held by some transaction.
    pub fn is_locked(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }
}

// == Guard ==
/// Holds a key set until dropped, on every exit path.
#[derive(Debug)]
pub struct KeyLockGuard<'a> {
    locks: &'a KeyLocks,
    keys: Vec<String>,
}

impl Drop for KeyLockGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
