//! Cache strategies.

use crate::utils::duration_ms;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Separator between strategy name and key in durable-tier storage keys.
pub(crate) const STORAGE_KEY_SEPARATOR: &str = "::";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Named cache policy governing a class of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStrategy {
    pub name: String,
    #[serde(rename = "ttl_ms", with = "duration_ms")]
    pub ttl: Duration,
    pub max_size: usize,
    /// Reserved for payload codecs. Values are stored as-is regardless of this flag.
    #[serde(default)]
    pub compress: bool,
    #[serde(default)]
    pub priority: CachePriority,
}

impl CacheStrategy {
    pub fn new(name: impl Into<String>, ttl: Duration, max_size: usize) -> Self {
        Self {
            name: name.into(),
            ttl,
            max_size,
            compress: false,
            priority: CachePriority::Medium,
        }
    }
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
    pub fn with_priority(mut self, priority: CachePriority) -> Self {
        self.priority = priority;
        self
    }

    fn validate(&self, index: usize) -> Result<()> {
        let ctx = || {
            ErrorContext::new()
                .with_field_path(format!("cache.strategies[{}]", index))
                .with_component("strategy_registry")
        };
        if self.name.is_empty() || self.name.contains(STORAGE_KEY_SEPARATOR) {
            return Err(Error::configuration_with_context(
                "strategy name must be non-empty and must not contain '::'",
                ctx().with_details(self.name.clone()),
            ));
        }
        if self.max_size == 0 {
            return Err(Error::configuration_with_context(
                "strategy max_size must be at least 1",
                ctx().with_details(self.name.clone()),
            ));
        }
        if self.ttl.is_zero() {
            return Err(Error::configuration_with_context(
                "strategy ttl must be positive",
                ctx().with_details(self.name.clone()),
            ));
        }
        Ok(())
    }
}

/// Strategies shipped with the assistant: AI responses, roster recommendations,
/// scheduler task results and conversation transcripts.
pub fn default_strategies() -> Vec<CacheStrategy> {
    vec![
        CacheStrategy::new("ai_responses", Duration::from_secs(60 * 60), 500)
            .with_priority(CachePriority::High),
        CacheStrategy::new("recommendations", Duration::from_secs(30 * 60), 100),
        CacheStrategy::new("task_results", Duration::from_secs(15 * 60), 1000),
        CacheStrategy::new("conversations", Duration::from_secs(24 * 60 * 60), 200)
            .with_compression(true)
            .with_priority(CachePriority::Low),
    ]
}

/// Immutable set of strategies declared at startup.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<String, CacheStrategy>,
}

impl StrategyRegistry {
    pub fn new(strategies: Vec<CacheStrategy>) -> Result<Self> {
        let mut map = HashMap::with_capacity(strategies.len());
        for (i, s) in strategies.into_iter().enumerate() {
            s.validate(i)?;
            if map.contains_key(&s.name) {
                return Err(Error::configuration_with_context(
                    "duplicate cache strategy",
                    ErrorContext::new()
                        .with_field_path(format!("cache.strategies[{}]", i))
                        .with_details(s.name.clone())
                        .with_component("strategy_registry"),
                ));
            }
            map.insert(s.name.clone(), s);
        }
        Ok(Self { strategies: map })
    }

    pub fn get(&self, name: &str) -> Option<&CacheStrategy> {
        self.strategies.get(name)
    }
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
    pub fn len(&self) -> usize {
        self.strategies.len()
    }
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

pub(crate) fn storage_key(strategy: &str, key: &str) -> String {
    format!("{}{}{}", strategy, STORAGE_KEY_SEPARATOR, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_strategies_are_valid() {
        let registry = StrategyRegistry::new(default_strategies()).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.names(),
            vec!["ai_responses", "conversations", "recommendations", "task_results"]
        );
        assert!(registry.get("conversations").unwrap().compress);
    }

    #[test]
    fn test_duplicate_strategy_rejected() {
        let s = CacheStrategy::new("x", Duration::from_secs(1), 10);
        let err = StrategyRegistry::new(vec![s.clone(), s]).unwrap_err();
        assert!(err.to_string().contains("duplicate cache strategy"));
    }

    #[test]
    fn test_invalid_strategies_rejected() {
        assert!(StrategyRegistry::new(vec![CacheStrategy::new("a::b", Duration::from_secs(1), 1)]).is_err());
        assert!(StrategyRegistry::new(vec![CacheStrategy::new("a", Duration::from_secs(1), 0)]).is_err());
        assert!(StrategyRegistry::new(vec![CacheStrategy::new("a", Duration::ZERO, 1)]).is_err());
    }

    #[test]
    fn test_strategy_yaml_uses_milliseconds() {
        let s: CacheStrategy =
            serde_yaml::from_str("name: x\nttl_ms: 1500\nmax_size: 3\npriority: high\n").unwrap();
        assert_eq!(s.ttl, Duration::from_millis(1500));
        assert_eq!(s.priority, CachePriority::High);
        assert!(!s.compress);
    }
}
