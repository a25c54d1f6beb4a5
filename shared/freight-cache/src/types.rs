//! Common types for the response cache

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// One stored entry: the raw JSON value plus its optional expiry instant.
/// Entries with no expiry never go stale on their own; the cache may still
/// evict them under pressure (not modeled here, since this reference
/// implementation is process-local and test-oriented).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: serde_json::Value,
    #[serde(skip)]
    pub(crate) expires_at: Option<Instant>,
}

impl CacheEntry {
    pub fn is_expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() >= at)
    }
}
