//! API Handlers
//!
//! HTTP request handlers exposing the adapter operations.
//!
//! Engine calls are synchronous. Anything that can wait on a key-set lock or
//! touch the filesystem runs on the blocking pool.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{Path, Query as UrlQuery, State},
    Json,
};
use tracing::info;

use crate::adapter::{CacheHandle, Query, StreamOptions, DEFAULT_PAGE_SIZE};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    CountResponse, CounterRequest, CounterResponse, DeleteResponse, ExpireRequest,
    ExpireResponse, GetResponse, HealthResponse, KeysParams, KeysResponse, SetRequest,
    SetResponse, SnapshotResponse, StatsResponse, TtlResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the engine instance
    pub cache: CacheHandle,
    /// Snapshot file for dump/load
    pub snapshot_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(cache: CacheHandle, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            cache,
            snapshot_path: Arc::new(snapshot_path.into()),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Starts a fresh engine instance with parameters from the Config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(CacheHandle::start(config), config.snapshot_path.clone())
    }
}

/// Runs an engine call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| CacheError::Internal(err.to_string()))?
}

/// Handler for PUT /set
///
/// Stores a value under the requested write policy and TTL. Plain
/// `insert_if_absent` keeps its check-then-write race unless `locked` is set.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    let cache = state.cache.clone();
    let key = req.key.clone();
    let written = blocking(move || {
        if req.locked {
            cache.put_new_locked(req.key, req.value, ttl)
        } else {
            cache.put(req.key, req.value, ttl, req.policy)
        }
    })
    .await?;

    Ok(Json(SetResponse::new(key, written)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
///
/// Deleting a missing key succeeds.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    state.cache.delete(&key);
    Json(DeleteResponse::new(key))
}

/// Handler for POST /take/:key
///
/// Removes the key and returns the value it held.
pub async fn take_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.take(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /ttl/:key
pub async fn ttl_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TtlResponse>> {
    match state.cache.ttl(&key) {
        Some(ttl) => Ok(Json(TtlResponse { key, ttl })),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /expire
pub async fn expire_handler(
    State(state): State<AppState>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<ExpireResponse>> {
    let updated = state.cache.expire(&req.key, req.ttl())?;
    Ok(Json(ExpireResponse {
        key: req.key,
        updated,
    }))
}

/// Handler for POST /counter
pub async fn counter_handler(
    State(state): State<AppState>,
    Json(req): Json<CounterRequest>,
) -> Result<Json<CounterResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    let cache = state.cache.clone();
    let key = req.key.clone();
    let value =
        blocking(move || cache.update_counter(&req.key, req.amount, ttl, req.default)).await?;

    Ok(Json(CounterResponse { key, value }))
}

/// Handler for GET /keys
///
/// Streams live (or, with `expired=true`, expired) entries page by page.
pub async fn keys_handler(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<KeysParams>,
) -> Result<Json<KeysResponse>> {
    let query = if params.expired {
        Query::Expired
    } else {
        Query::Everything
    };
    let opts = StreamOptions {
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        return_shape: params.shape,
    };

    let cache = state.cache.clone();
    let results = blocking(move || cache.all(&query, &opts)).await?;
    Ok(Json(KeysResponse::new(results)))
}

/// Handler for GET /count
pub async fn count_handler(State(state): State<AppState>) -> Result<Json<CountResponse>> {
    let count = state.cache.count_all(&Query::Everything)?;
    Ok(Json(CountResponse { count }))
}

/// Handler for POST /purge
///
/// Removes expired entries now instead of waiting for the janitor.
pub async fn purge_handler(State(state): State<AppState>) -> Result<Json<CountResponse>> {
    let count = state.cache.delete_all(&Query::Expired)?;
    Ok(Json(CountResponse { count }))
}

/// Handler for POST /dump
pub async fn dump_handler(State(state): State<AppState>) -> Result<Json<SnapshotResponse>> {
    let cache = state.cache.clone();
    let path = state.snapshot_path.clone();
    blocking(move || cache.dump(path.as_path())).await?;

    info!("Snapshot written to {}", state.snapshot_path.display());
    Ok(Json(SnapshotResponse {
        message: "Snapshot written".to_string(),
        path: state.snapshot_path.display().to_string(),
    }))
}

/// Handler for POST /load
pub async fn load_handler(State(state): State<AppState>) -> Result<Json<SnapshotResponse>> {
    let cache = state.cache.clone();
    let path = state.snapshot_path.clone();
    blocking(move || cache.load(path.as_path())).await?;

    info!("Snapshot loaded from {}", state.snapshot_path.display());
    Ok(Json(SnapshotResponse {
        message: "Snapshot loaded".to_string(),
        path: state.snapshot_path.display().to_string(),
    }))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let total_entries = state.cache.count_all(&Query::Everything)?;
    Ok(Json(StatsResponse::new(
        state.cache.name(),
        total_entries,
        state.cache.stats(),
    )))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
