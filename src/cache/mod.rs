//! Post cache consistency layer
//!
//! Wraps the resource store with a shared key-value cache:
//!
//! - **Read-through**: reads consult the cache first and populate it on a miss
//! - **Write/invalidate**: writes delete every affected key once they have committed
//!
//! Cache failures never surface to callers. Entries carry a TTL (60s by default), which
//! bounds how long a missed invalidation can serve stale data.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! ttl_seconds = 60
//! key_scope = "shared"   # or "per_caller"
//! backend = "memory"     # or "redis"
//! redis_url = "redis://127.0.0.1:6379"
//! ```

mod config;
mod invalidate;
mod keys;
mod read_through;
mod redis_store;
mod store;

use std::sync::Arc;

pub use config::{CacheBackendKind, CacheConfig};
pub use invalidate::{WriteInterrupted, WritePath};
pub use keys::{
    CallerFingerprint, Invalidation, InvalidationTarget, KeyPolicy, ResourceKind, ResourceScope,
    derive_key,
};
pub use read_through::ReadThroughCache;
pub use redis_store::RedisCacheStore;
pub use store::{CacheError, CacheStore, MemoryCacheStore};

/// Read and write handles sharing one store, injected into application services.
#[derive(Clone)]
pub struct CacheState {
    pub reads: ReadThroughCache,
    pub writes: WritePath,
    pub policy: KeyPolicy,
}

impl CacheState {
    pub fn new(config: &CacheConfig, store: Arc<dyn CacheStore>) -> Self {
        Self {
            reads: ReadThroughCache::new(store.clone(), config.effective_ttl(), config.enabled),
            writes: WritePath::new(store, config.key_policy, config.enabled),
            policy: config.key_policy,
        }
    }

    /// Key under which `fingerprint`'s caller reads `resource`.
    pub fn read_key(
        &self,
        resource: ResourceKind,
        scope: ResourceScope,
        fingerprint: &CallerFingerprint,
    ) -> String {
        self.policy.read_key(resource, scope, fingerprint)
    }
}
