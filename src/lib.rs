//! Cache Bridge - a generic cache contract over an in-process cache engine
//!
//! Maps write policies, TTLs, counters, declarative queries, paginated
//! streams, snapshots and stats onto the engine's native primitives.

pub mod adapter;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod tasks;

pub use adapter::CacheHandle;
pub use api::AppState;
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_janitor;
