//! Redis-backed cache store for deployments that share a cache between processes.

use async_trait::async_trait;
use deadpool_redis::{Config as PoolConfig, Pool, Runtime};
use redis::AsyncCommands;
use tracing::debug;

use super::store::{CacheError, CacheStore};

const SCAN_BATCH: usize = 100;

#[derive(Clone)]
pub struct RedisCacheStore {
    pool: Pool,
}

impl RedisCacheStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Build a pool for `url`. No connection is opened until first use.
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let pool = PoolConfig::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(CacheError::unavailable)?;
        Ok(Self::new(pool))
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool.get().await.map_err(CacheError::unavailable)
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|err| CacheError::command("GET", err))
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds.max(1))
            .await
            .map_err(|err| CacheError::command("SET", err))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key)
            .await
            .map_err(|err| CacheError::command("DEL", err))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut conn = self.connection().await?;
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|err| CacheError::command("SCAN", err))?;

            if !keys.is_empty() {
                removed += conn
                    .del::<_, u64>(&keys)
                    .await
                    .map_err(|err| CacheError::command("DEL", err))?;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(prefix, removed, "cleared cache keys by prefix");
        Ok(removed)
    }
}

/// Escape glob metacharacters so a prefix matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
