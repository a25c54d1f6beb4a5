//! Cache error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// The cache may fail (backend unavailable); callers are expected to log
/// it and continue as on a cache miss, never propagate it to the request
/// boundary.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
