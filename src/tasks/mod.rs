//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Janitor: Removes expired entries at the configured sweep interval

mod janitor;

pub use janitor::spawn_janitor;
