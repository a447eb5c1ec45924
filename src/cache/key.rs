//! Cache key generation.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Derives deterministic keys of the form `namespace:<sha256-hex>` from structured input.
#[derive(Debug, Clone)]
pub struct CacheKeyGenerator {
    namespace: String,
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            salt: None,
        }
    }
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Key from named parts; part order does not matter.
    pub fn generate(&self, parts: &[(&str, &str)]) -> String {
        let mut canonical: BTreeMap<&str, &str> = parts.iter().copied().collect();
        if let Some(ref s) = self.salt {
            canonical.insert("salt", s);
        }
        self.finish(serde_json::to_string(&canonical).unwrap_or_default())
    }

    /// Key from any serializable value (e.g. a task payload).
    pub fn generate_from<T: Serialize>(&self, value: &T) -> String {
        let body = serde_json::to_string(value).unwrap_or_default();
        let mut canonical: BTreeMap<&str, &str> = BTreeMap::new();
        canonical.insert("value", &body);
        if let Some(ref s) = self.salt {
            canonical.insert("salt", s);
        }
        self.finish(serde_json::to_string(&canonical).unwrap_or_default())
    }

    fn finish(&self, canonical: String) -> String {
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        format!("{}:{}", self.namespace, hash)
    }
}
