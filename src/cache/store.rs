//! Cache store abstraction and the in-process implementation.
//!
//! Values are JSON strings. TTLs are whole seconds supplied at write time. Expired entries
//! are indistinguishable from absent ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command `{command}` failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

impl CacheError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    pub fn command(command: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Command {
            command,
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

/// Writes between full sweeps of expired entries.
const SWEEP_EVERY_WRITES: usize = 256;

/// Single-process cache backed by a concurrent map.
///
/// Expired entries are dropped when read, and by a sweep that runs every
/// [`SWEEP_EVERY_WRITES`] writes for keys that are never read again.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, MemoryEntry>,
    writes_since_sweep: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until the next read or sweep.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    fn note_write(&self) {
        let writes = self.writes_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if writes >= SWEEP_EVERY_WRITES {
            self.writes_since_sweep.store(0, Ordering::Relaxed);
            let removed = self.purge_expired();
            if removed > 0 {
                debug!(cache = "memory", removed, "swept expired cache entries");
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                return Ok(Some(entry.value.clone()));
            }
        } else {
            return Ok(None);
        }
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl_seconds: u64) -> Result<(), CacheError> {
        let expires_at = Instant::now() + Duration::from_secs(ttl_seconds.max(1));
        self.entries
            .insert(key.to_string(), MemoryEntry { value, expires_at });
        self.note_write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, CacheError> {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }
}
