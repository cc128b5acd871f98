//! TTL Module
//!
//! Caller-facing TTL and its translation into the engine's representation.

use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::{CacheError, Result};

// == Ttl ==
/// Time to live, always relative to the most recent write or touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ttl {
    /// Never expires
    #[default]
    Infinite,
    /// Expires once this much time has passed since the last write/touch
    Finite(Duration),
}

impl Ttl {
    pub fn from_millis(ms: u64) -> Self {
        Ttl::Finite(Duration::from_millis(ms))
    }

    pub fn from_secs(secs: u64) -> Self {
        Ttl::Finite(Duration::from_secs(secs))
    }

    // == Normalize ==
    /// Engine form: `None` is "no expiration", otherwise milliseconds.
    ///
    /// Sub-millisecond durations round up to one millisecond.
    pub fn normalize(self) -> Option<u64> {
        match self {
            Ttl::Infinite => None,
            Ttl::Finite(duration) => {
                let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                Some(if ms == 0 && !duration.is_zero() { 1 } else { ms })
            }
        }
    }

    /// Inverse of [`Ttl::normalize`].
    pub fn from_engine(ttl: Option<u64>) -> Self {
        match ttl {
            None => Ttl::Infinite,
            Some(ms) => Ttl::from_millis(ms),
        }
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Ttl::Infinite)
    }
}

impl From<Option<Duration>> for Ttl {
    fn from(duration: Option<Duration>) -> Self {
        duration.map_or(Ttl::Infinite, Ttl::Finite)
    }
}

/// Serialized as `"infinity"` or a number of milliseconds.
impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.normalize() {
            None => serializer.serialize_str("infinity"),
            Some(ms) => serializer.serialize_u64(ms),
        }
    }
}

/// Normalizes a TTL headed for a write, expire or counter call.
///
/// A finite TTL must be positive.
pub(crate) fn engine_ttl(ttl: Ttl) -> Result<Option<u64>> {
    match ttl {
        Ttl::Finite(duration) if duration.is_zero() => Err(CacheError::InvalidRequest(
            "ttl must be a positive duration".to_string(),
        )),
        ttl => Ok(ttl.normalize()),
    }
}
