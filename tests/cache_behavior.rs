//! Integration tests for the two-tier cache

use assist_orchestrator::cache::{
    CacheConfig, CacheManager, CacheStrategy, DurableStore, KeyPattern, MemoryStore,
};
use assist_orchestrator::{Error, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn config_with(strategy: CacheStrategy) -> CacheConfig {
    CacheConfig::new().with_strategy(strategy)
}

#[tokio::test]
async fn test_entry_absent_once_ttl_elapsed() {
    let cache = CacheManager::in_memory(config_with(CacheStrategy::new(
        "x",
        Duration::from_millis(1000),
        10,
    )))
    .unwrap();
    let _ = cache.set("k1", json!("v1"), "x", None).await;
    assert_eq!(cache.get("k1", "x").await, Some(json!("v1")));

    tokio::time::sleep(Duration::from_millis(1100)).await;

    // No sweep has run; the read itself treats the entry as expired.
    assert_eq!(cache.get("k1", "x").await, None);
}

#[tokio::test]
async fn test_durable_tier_repopulates_fast_tier() {
    let durable: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let config = config_with(CacheStrategy::new("answers", Duration::from_secs(60), 10));

    let writer = CacheManager::new(config.clone(), durable.clone()).unwrap();
    assert!(writer.set("q:1", json!({"a": 1}), "answers", None).await.wait().await);

    let reader = CacheManager::new(config, durable).unwrap();
    assert!(reader.is_empty().await);
    assert_eq!(reader.get("q:1", "answers").await, Some(json!({"a": 1})));
    assert_eq!(reader.len_for("answers").await, 1);
    assert_eq!(reader.metrics().hits, 1);
}

#[tokio::test]
async fn test_size_bound_evicts_oldest_first() {
    let cache = CacheManager::in_memory(config_with(CacheStrategy::new(
        "small",
        Duration::from_secs(60),
        3,
    )))
    .unwrap();
    for i in 0..5 {
        let _ = cache.set(&format!("k{}", i), json!(i), "small", None).await;
        // Reading does not refresh insertion order.
        let _ = cache.get("k0", "small").await;
    }
    assert_eq!(cache.len_for("small").await, 3);
    assert!(!cache.contains("k0", "small").await);
    assert!(!cache.contains("k1", "small").await);
    for key in ["k2", "k3", "k4"] {
        assert!(cache.contains(key, "small").await, "{} should survive", key);
    }
    assert_eq!(cache.metrics().evictions, 2);
}

#[tokio::test]
async fn test_invalidate_counts_distinct_keys_across_tiers() {
    let durable: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let config = config_with(CacheStrategy::new("s", Duration::from_secs(60), 10));
    let cache = CacheManager::new(config.clone(), durable.clone()).unwrap();

    for key in ["user:1", "user:2", "team:1"] {
        assert!(cache.set(key, json!(key), "s", None).await.wait().await);
    }
    // Present in both tiers, counted once each.
    assert_eq!(cache.invalidate(&KeyPattern::parse("user:*").unwrap()).await, 2);
    assert_eq!(cache.get("user:1", "s").await, None);

    // Present only in the durable tier of a second manager.
    let other = CacheManager::new(config, durable).unwrap();
    assert_eq!(other.invalidate(&KeyPattern::from("team:1")).await, 1);
    assert_eq!(cache.invalidate(&KeyPattern::from("team:1")).await, 1);
    assert_eq!(cache.invalidate(&KeyPattern::from("team:1")).await, 0);
}

struct BrokenStore;

#[async_trait]
impl DurableStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(Error::runtime("connection refused"))
    }
    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<()> {
        Err(Error::runtime("connection refused"))
    }
    async fn delete(&self, _key: &str) -> Result<bool> {
        Err(Error::runtime("connection refused"))
    }
    async fn delete_matching(&self, _pattern: &KeyPattern) -> Result<Vec<String>> {
        Err(Error::runtime("connection refused"))
    }
    fn name(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_durable_failures_never_surface() {
    let cache = CacheManager::new(CacheConfig::default(), Arc::new(BrokenStore)).unwrap();

    assert_eq!(cache.get("missing", "ai_responses").await, None);
    let replication = cache.set("k", json!(1), "ai_responses", None).await;
    assert!(!replication.wait().await);
    assert_eq!(cache.get("k", "ai_responses").await, Some(json!(1)));
    assert_eq!(cache.invalidate(&KeyPattern::from("k")).await, 1);

    let metrics = cache.metrics();
    assert!(metrics.durable_errors >= 2);
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 1);
    assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_warm_up_loads_from_durable_tier() {
    let durable: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let config = CacheConfig::default();
    let seed = CacheManager::new(config.clone(), durable.clone()).unwrap();
    for key in ["a", "b"] {
        assert!(seed.set(key, json!(key), "recommendations", None).await.wait().await);
    }

    let cache = CacheManager::new(config, durable).unwrap();
    assert_eq!(cache.warm_up(&["a", "b", "c"], "recommendations").await, 2);
    assert_eq!(cache.len_for("recommendations").await, 2);
}
