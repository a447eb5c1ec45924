//! Cache entries and their durable-tier envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type EntryMetadata = HashMap<String, Value>;

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A fast-tier cache entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub strategy: String,
    pub value: Value,
    pub created_at_ms: u64,
    pub ttl: Duration,
    pub version: String,
    pub metadata: Option<EntryMetadata>,
    /// Insertion order, breaks timestamp ties during eviction.
    pub(crate) sequence: u64,
}

impl CacheEntry {
    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.created_at_ms))
    }

    /// An entry is expired once its age reaches the ttl.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.age(now_ms) >= self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_ms())
    }

    pub(crate) fn to_record(&self) -> DurableRecord {
        DurableRecord {
            value: self.value.clone(),
            created_at_ms: self.created_at_ms,
            ttl_ms: self.ttl.as_millis() as u64,
            version: self.version.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// JSON envelope written to the durable tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurableRecord {
    pub value: Value,
    pub created_at_ms: u64,
    pub ttl_ms: u64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl DurableRecord {
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.created_at_ms) >= self.ttl_ms
    }

    pub(crate) fn into_entry(self, key: &str, strategy: &str, sequence: u64) -> CacheEntry {
        CacheEntry {
            key: key.to_string(),
            strategy: strategy.to_string(),
            value: self.value,
            created_at_ms: self.created_at_ms,
            ttl: Duration::from_millis(self.ttl_ms),
            version: self.version,
            metadata: self.metadata,
            sequence,
        }
    }
}
