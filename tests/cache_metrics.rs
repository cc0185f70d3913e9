use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::debugging::DebuggingRecorder;

use postcache::cache::{
    CacheConfig, CacheError, CacheState, CacheStore, CallerFingerprint, InvalidationTarget,
    MemoryCacheStore, ResourceKind, ResourceScope,
};

struct BrokenStore;

#[async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::command("GET", "broken pipe"))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: u64) -> Result<(), CacheError> {
        Err(CacheError::command("SET", "broken pipe"))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::command("DEL", "broken pipe"))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::command("SCAN", "broken pipe"))
    }
}

#[tokio::test]
async fn cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let healthy = CacheState::new(&CacheConfig::default(), Arc::new(MemoryCacheStore::new()));
    let key = healthy.read_key(
        ResourceKind::Post,
        ResourceScope::Collection,
        &CallerFingerprint::from_credential("token"),
    );

    for _ in 0..2 {
        let value: Vec<i64> = healthy
            .reads
            .read_through(&key, || async { Ok::<_, std::io::Error>(vec![1, 2, 3]) })
            .await
            .expect("read through healthy store");
        assert_eq!(value, vec![1, 2, 3]);
    }
    healthy
        .writes
        .invalidate(&[InvalidationTarget::collection(ResourceKind::Post)])
        .await;

    let broken = CacheState::new(&CacheConfig::default(), Arc::new(BrokenStore));
    let value: Vec<i64> = broken
        .reads
        .read_through(&key, || async { Ok::<_, std::io::Error>(vec![4]) })
        .await
        .expect("broken store falls back to fetch");
    assert_eq!(value, vec![4]);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "postcache_cache_hit_total",
        "postcache_cache_miss_total",
        "postcache_cache_error_total",
        "postcache_cache_invalidate_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
