//! Engine Entry Module
//!
//! Defines the stored record with its touch time and relative TTL.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Engine Entry ==
/// Represents a single stored entry.
///
/// The TTL is relative to `touched_at`: the entry expires once
/// `touched_at + ttl` has been reached. `ttl = None` never expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEntry {
    /// The stored value
    pub value: Value,
    /// Last write/touch timestamp (Unix milliseconds)
    pub touched_at: u64,
    /// Time to live in milliseconds, None = no expiration
    pub ttl: Option<u64>,
}

impl EngineEntry {
    // == Constructor ==
    /// Creates a new entry touched now.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL in milliseconds
    pub fn new(value: Value, ttl: Option<u64>) -> Self {
        Self {
            value,
            touched_at: current_timestamp_ms(),
            ttl,
        }
    }

    // == Expires At ==
    /// Absolute expiration timestamp, None if the entry never expires.
    pub fn expires_at(&self) -> Option<u64> {
        self.ttl.map(|ttl| self.touched_at.saturating_add(ttl))
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired when the current time is greater than or equal to
    /// the expiration time, so a fully elapsed TTL expires immediately.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at() {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Checks if the entry has expired now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the entry has expired
    /// - `Some(remaining_ms)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.ttl_remaining_at(current_timestamp_ms())
    }

    /// Remaining TTL measured against `now`.
    pub fn ttl_remaining_at(&self, now: u64) -> Option<u64> {
        self.expires_at().map(|expires| expires.saturating_sub(now))
    }

    // == Touch ==
    /// Resets the touch time, restarting the relative TTL.
    pub fn touch(&mut self) {
        self.touched_at = current_timestamp_ms();
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_entry_creation_no_ttl() {
        let entry = EngineEntry::new(json!("test_value"), None);

        assert_eq!(entry.value, json!("test_value"));
        assert!(entry.expires_at().is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[test]
    fn test_entry_expiration() {
        let entry = EngineEntry::new(json!(1), Some(50));

        assert!(!entry.is_expired());
        sleep(Duration::from_millis(80));
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[test]
    fn test_ttl_remaining_ms() {
        let entry = EngineEntry::new(json!(1), Some(10_000));

        let remaining_ms = entry.ttl_remaining_ms().unwrap();
        assert!(remaining_ms <= 10_000);
        assert!(remaining_ms >= 9_000);
    }

    #[test]
    fn test_touch_restarts_ttl() {
        let mut entry = EngineEntry::new(json!(1), Some(100));
        entry.touched_at -= 90;
        assert!(entry.ttl_remaining_ms().unwrap() <= 10);

        entry.touch();
        assert!(entry.ttl_remaining_ms().unwrap() > 50);
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let now = current_timestamp_ms();
        let entry = EngineEntry {
            value: json!("test"),
            touched_at: now,
            ttl: Some(0),
        };

        assert!(entry.is_expired_at(now), "Entry should be expired at boundary");
    }

    #[test]
    fn test_ttl_remaining_at_same_instant_as_expiry_check() {
        let entry = EngineEntry {
            value: json!(1),
            touched_at: 1_000,
            ttl: Some(500),
        };

        assert!(!entry.is_expired_at(1_499));
        assert_eq!(entry.ttl_remaining_at(1_499), Some(1));
        assert!(entry.is_expired_at(1_500));
        assert_eq!(entry.ttl_remaining_at(1_500), Some(0));
    }
}
