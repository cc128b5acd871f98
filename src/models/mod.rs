//! Request and Response models for the cache server API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

pub use requests::{CounterRequest, ExpireRequest, KeysParams, SetRequest};
pub use responses::{
    CountResponse, CounterResponse, DeleteResponse, ExpireResponse, GetResponse, HealthResponse,
    KeysResponse, SetResponse, SnapshotResponse, StatsResponse, TtlResponse,
};
