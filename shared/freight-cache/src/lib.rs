//! Freight response cache client
//!
//! An opaque key/value store used to cache carrier responses and product
//! envelopes, keyed by a UUIDv5 request fingerprint. Production
//! deployments back this with an external KV store; the `CacheClient` trait
//! is the seam, and `InMemoryCacheClient` is the in-process reference
//! implementation this crate ships for tests and local runs.

mod client;
mod error;
mod fingerprint;
mod types;

pub use client::{CacheClient, CacheClientExt, InMemoryCacheClient};
pub use error::{CacheError, Result};
pub use fingerprint::fingerprint;
pub use types::CacheEntry;
