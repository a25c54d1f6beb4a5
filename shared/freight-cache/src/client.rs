//! Opaque cache client

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::CacheEntry;
use crate::Result;

/// `get(key) -> value | none`, `set(key, value, expire?)`. Implementations
/// are expected to be thread-safe and to swallow backend failures: a
/// failing cache must behave like a miss, never fail the caller's request.
#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get_raw(&self, key: Uuid) -> Option<serde_json::Value>;
    async fn set_raw(&self, key: Uuid, value: serde_json::Value, expire: Option<Duration>);
}

/// Typed convenience wrappers layered over the opaque raw interface.
pub trait CacheClientExt: CacheClient {
    fn get<T: DeserializeOwned>(&self, key: Uuid) -> impl std::future::Future<Output = Option<T>> + Send
    where
        Self: Sync,
    {
        async move {
            let raw = self.get_raw(key).await?;
            match serde_json::from_value(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "cache entry failed to deserialize, treating as miss");
                    None
                }
            }
        }
    }

    fn set<T: Serialize + Sync>(
        &self,
        key: Uuid,
        value: &T,
        expire: Option<Duration>,
    ) -> impl std::future::Future<Output = ()> + Send
    where
        Self: Sync,
    {
        async move {
            match serde_json::to_value(value) {
                Ok(raw) => self.set_raw(key, raw, expire).await,
                Err(e) => warn!(error = %e, "failed to serialize value for cache write"),
            }
        }
    }
}

impl<C: CacheClient + ?Sized> CacheClientExt for C {}

/// In-process, `DashMap`-backed reference implementation of [`CacheClient`].
///
/// This is what the aggregator and its tests use in place of an external
/// KV store; the real backing store is treated as an opaque external
/// collaborator, so this crate only needs to agree on the interface and
/// ship something that satisfies it for local runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryCacheClient {
    entries: DashMap<Uuid, CacheEntry>,
}

impl InMemoryCacheClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheClient for InMemoryCacheClient {
    async fn get_raw(&self, key: Uuid) -> Option<serde_json::Value> {
        let entry = self.entries.get(&key)?;
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(&key);
            debug!(%key, "cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    async fn set_raw(&self, key: Uuid, value: serde_json::Value, expire: Option<Duration>) {
        let expires_at = expire.map(|d| Instant::now() + d);
        self.entries.insert(key, CacheEntry { value, expires_at });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn hit_after_set_miss_before() {
        let cache = InMemoryCacheClient::new();
        let key = Uuid::new_v4();
        assert!(cache.get_raw(key).await.is_none());

        cache.set_raw(key, serde_json::json!({"hello": "world"}), None).await;
        let value = cache.get_raw(key).await.unwrap();
        assert_eq!(value["hello"], "world");
    }

    #[tokio::test]
    async fn entries_expire() {
        let cache = InMemoryCacheClient::new();
        let key = Uuid::new_v4();
        cache
            .set_raw(key, serde_json::json!(1), Some(StdDuration::from_millis(10)))
            .await;
        assert!(cache.get_raw(key).await.is_some());
        tokio::time::sleep(StdDuration::from_millis(30)).await;
        assert!(cache.get_raw(key).await.is_none());
    }

    #[tokio::test]
    async fn typed_get_set_round_trips() {
        #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
        struct Envelope {
            count: usize,
        }

        let cache = InMemoryCacheClient::new();
        let key = Uuid::new_v4();
        cache.set(key, &Envelope { count: 3 }, None).await;
        let round_tripped: Envelope = cache.get(key).await.unwrap();
        assert_eq!(round_tripped, Envelope { count: 3 });
    }
}
