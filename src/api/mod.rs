//! API Module
//!
//! HTTP handlers and routing exposing the cache adapter over REST.
//!
//! # Endpoints
//! - `PUT /set` - Store a value under a write policy and TTL
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `POST /take/:key` - Remove a key and return its value
//! - `GET /ttl/:key` - Remaining TTL of a key
//! - `POST /expire` - Set a new TTL on a key
//! - `POST /counter` - Increment a counter
//! - `GET /keys` - Paginated listing of entries
//! - `GET /count` - Number of live entries
//! - `POST /purge` - Remove expired entries
//! - `POST /dump`, `POST /load` - Snapshot to and from the configured file
//! - `GET /stats` - Engine statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
