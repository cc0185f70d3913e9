//! Read-through cache layer.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use super::store::CacheStore;

pub(crate) const METRIC_CACHE_HIT: &str = "postcache_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "postcache_cache_miss_total";
pub(crate) const METRIC_CACHE_ERROR: &str = "postcache_cache_error_total";

#[derive(Clone)]
pub struct ReadThroughCache {
    store: Arc<dyn CacheStore>,
    ttl_seconds: u64,
    enabled: bool,
}

impl ReadThroughCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl_seconds: u64, enabled: bool) -> Self {
        Self {
            store,
            ttl_seconds: ttl_seconds.max(1),
            enabled,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Return the cached value for `key`, or fetch, store and return it.
    ///
    /// Cache failures degrade to a miss and are never surfaced. A failed fetch is
    /// propagated and leaves the cache untouched.
    pub async fn read_through<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return fetch().await;
        }

        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    debug!(cache = "read_through", outcome = "hit", key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    counter!(METRIC_CACHE_ERROR, "op" => "decode").increment(1);
                    warn!(
                        cache = "read_through",
                        key,
                        error = %err,
                        "discarding undecodable cache entry"
                    );
                }
            },
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "get").increment(1);
                warn!(
                    cache = "read_through",
                    key,
                    error = %err,
                    "cache read failed; falling back to store"
                );
            }
        }

        counter!(METRIC_CACHE_MISS).increment(1);
        debug!(cache = "read_through", outcome = "miss", key, "cache miss");

        let value = fetch().await?;

        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(err) = self.store.set(key, raw, self.ttl_seconds).await {
                    counter!(METRIC_CACHE_ERROR, "op" => "set").increment(1);
                    warn!(
                        cache = "read_through",
                        key,
                        error = %err,
                        "cache write failed; value served uncached"
                    );
                }
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "encode").increment(1);
                warn!(cache = "read_through", key, error = %err, "value not cacheable");
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::store::{CacheError, MemoryCacheStore};

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: u64) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
            Err(CacheError::unavailable("connection refused"))
        }
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ReadThroughCache::new(store.clone(), 60, true);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Vec<u32> = cache
                .read_through("collection:post", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(vec![1, 2, 3])
                })
                .await
                .expect("read");
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.get("collection:post").await.expect("get").as_deref(),
            Some("[1,2,3]")
        );
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ReadThroughCache::new(store.clone(), 60, true);

        let result: Result<u32, &str> = cache
            .read_through("item:post:9", || async { Err("not found") })
            .await;

        assert_eq!(result, Err("not found"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_falls_through_to_fetch() {
        let cache = ReadThroughCache::new(Arc::new(FailingStore), 60, true);
        let value: String = cache
            .read_through("item:post:1", || async {
                Ok::<_, std::convert::Infallible>("fresh".to_string())
            })
            .await
            .expect("read");
        assert_eq!(value, "fresh");
    }

    #[tokio::test]
    async fn undecodable_entry_is_replaced() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set("item:post:1", "not json".to_string(), 60)
            .await
            .expect("set");
        let cache = ReadThroughCache::new(store.clone(), 60, true);

        let value: u32 = cache
            .read_through("item:post:1", || async {
                Ok::<_, std::convert::Infallible>(7)
            })
            .await
            .expect("read");

        assert_eq!(value, 7);
        assert_eq!(
            store.get("item:post:1").await.expect("get").as_deref(),
            Some("7")
        );
    }

    #[tokio::test]
    async fn disabled_cache_never_touches_store() {
        let store = Arc::new(MemoryCacheStore::new());
        let cache = ReadThroughCache::new(store.clone(), 60, false);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let _: u32 = cache
                .read_through("collection:post", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::convert::Infallible>(1)
                })
                .await
                .expect("read");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(store.is_empty());
    }
}
