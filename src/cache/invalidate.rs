//! Write/invalidate path.
//!
//! A mutation and the invalidation that follows it run on a detached task. The request
//! awaits the task, but dropping the request future does not cancel it, so a committed write
//! is never left without its invalidation.

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use super::keys::{Invalidation, InvalidationTarget, KeyPolicy};
use super::read_through::METRIC_CACHE_ERROR;
use super::store::CacheStore;

pub(crate) const METRIC_CACHE_INVALIDATE: &str = "postcache_cache_invalidate_total";

/// The write task ended without producing a result (runtime shutdown).
#[derive(Debug, Error)]
#[error("write task was cancelled before completing")]
pub struct WriteInterrupted;

#[derive(Clone)]
pub struct WritePath {
    store: Arc<dyn CacheStore>,
    policy: KeyPolicy,
    enabled: bool,
}

impl WritePath {
    pub fn new(store: Arc<dyn CacheStore>, policy: KeyPolicy, enabled: bool) -> Self {
        Self {
            store,
            policy,
            enabled,
        }
    }

    /// Run `write`, then invalidate whatever `targets` derives from its result.
    ///
    /// A failed write skips invalidation. Invalidation failures are logged and never change
    /// the write's outcome.
    pub async fn mutate<T, E, W, G>(&self, write: W, targets: G) -> Result<T, E>
    where
        W: Future<Output = Result<T, E>> + Send + 'static,
        G: FnOnce(&T) -> Vec<InvalidationTarget> + Send + 'static,
        T: Send + 'static,
        E: From<WriteInterrupted> + Send + 'static,
    {
        let path = self.clone();
        let task = tokio::spawn(async move {
            let value = write.await?;
            path.invalidate(&targets(&value)).await;
            Ok::<T, E>(value)
        });

        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Err(E::from(WriteInterrupted)),
        }
    }

    /// Remove every cached copy of each target. Never fails.
    pub async fn invalidate(&self, targets: &[InvalidationTarget]) {
        if !self.enabled {
            return;
        }

        for target in targets {
            let outcome = match self.policy.invalidation(*target) {
                Invalidation::Key(key) => self
                    .store
                    .delete(&key)
                    .await
                    .map(|()| 1)
                    .map_err(|err| (key, err)),
                Invalidation::Prefix(prefix) => self
                    .store
                    .delete_prefix(&prefix)
                    .await
                    .map_err(|err| (prefix, err)),
            };

            match outcome {
                Ok(removed) => {
                    counter!(METRIC_CACHE_INVALIDATE).increment(1);
                    debug!(
                        cache = "invalidate",
                        resource = target.resource.as_str(),
                        removed,
                        "invalidated cache entries"
                    );
                }
                Err((key, err)) => {
                    counter!(METRIC_CACHE_ERROR, "op" => "invalidate").increment(1);
                    warn!(
                        cache = "invalidate",
                        key = %key,
                        error = %err,
                        "cache invalidation failed; entry expires at ttl"
                    );
                }
            }
        }
    }
}
