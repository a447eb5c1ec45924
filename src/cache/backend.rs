//! Durable-tier store implementations.

use super::pattern::KeyPattern;
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// External key-value persistence behind the fast tier.
///
/// The cache manager wraps every call: errors returned here are logged and
/// degrade to a miss or a no-op.
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    /// Remove every key accepted by `pattern`, returning the removed keys.
    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}

struct StoredValue {
    data: Vec<u8>,
    stored_at: Instant,
    ttl: Duration,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }
}

/// In-process durable store, useful for tests and single-node deployments.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .filter(|e| !e.is_expired())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.is_expired() {
                entries.remove(key);
                return Ok(None);
            }
            return Ok(Some(entry.data.clone()));
        }
        Ok(None)
    }
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired());
        entries.insert(
            key.to_string(),
            StoredValue {
                data: value.to_vec(),
                stored_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }
    async fn delete_matching(&self, pattern: &KeyPattern) -> Result<Vec<String>> {
        let mut entries = self.entries.write().await;
        let doomed: Vec<String> = entries
            .keys()
            .filter(|k| pattern.matches_storage_key(k))
            .cloned()
            .collect();
        for k in &doomed {
            entries.remove(k);
        }
        Ok(doomed)
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// No durable tier: every lookup misses, every write is dropped.
pub struct NullStore;
impl NullStore {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DurableStore for NullStore {
    async fn get(&self, _: &str) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }
    async fn set(&self, _: &str, _: &[u8], _: Duration) -> Result<()> {
        Ok(())
    }
    async fn delete(&self, _: &str) -> Result<bool> {
        Ok(false)
    }
    async fn delete_matching(&self, _: &KeyPattern) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "null"
    }
}
