//! 两级缓存模块：按策略管理的快速内存层加尽力而为的持久层。
//!
//! # Two-Tier Cache Module
//!
//! Strategy-driven caching for AI responses, roster recommendations and scheduler
//! task results.
//!
//! ## Overview
//!
//! - **Fast tier**: in-process map, partitioned by strategy, consulted first
//! - **Durable tier**: injected [`DurableStore`], consulted on fast-tier misses and
//!   written on a best-effort basis; its failures never reach the caller
//! - **Expiry**: entries are absent once their age reaches the strategy ttl, and a
//!   background sweeper removes them periodically
//! - **Size bound**: per strategy, oldest entries (by creation time) are evicted first.
//!   Reads do not refresh an entry's position.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Two-tier get/set/invalidate with metrics |
//! | [`CacheConfig`] | Enable flag, sweep interval and strategy declarations |
//! | [`CacheStrategy`] | Named ttl / size / priority policy |
//! | [`DurableStore`] | Trait for the external key-value collaborator |
//! | [`MemoryStore`] | In-process durable store |
//! | [`NullStore`] | No durable tier |
//! | [`KeyPattern`] | Exact, glob or regex invalidation selector |
//! | [`CacheKeyGenerator`] | Deterministic hashed keys |
//!
//! ## Example
//!
//! ```rust
//! use assist_orchestrator::cache::{CacheConfig, CacheManager, CacheStrategy, KeyPattern};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let config = CacheConfig::new()
//!     .with_strategy(CacheStrategy::new("answers", Duration::from_secs(600), 100));
//! let cache = CacheManager::in_memory(config).unwrap();
//!
//! // The durable write handle may be dropped: replication is best effort.
//! let _ = cache.set("q:1", json!("42"), "answers", None).await;
//! assert_eq!(cache.get("q:1", "answers").await, Some(json!("42")));
//!
//! assert_eq!(cache.invalidate(&KeyPattern::parse("q:*").unwrap()).await, 1);
//! # });
//! ```

mod backend;
mod entry;
mod key;
mod manager;
mod pattern;
mod strategy;

pub use backend::{DurableStore, MemoryStore, NullStore};
pub use entry::{CacheEntry, DurableRecord, EntryMetadata};
pub use key::CacheKeyGenerator;
pub use manager::{CacheConfig, CacheManager, CacheMetrics, Replication};
pub use pattern::KeyPattern;
pub use strategy::{default_strategies, CachePriority, CacheStrategy, StrategyRegistry};
