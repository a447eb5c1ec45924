//! # assist-orchestrator
//!
//! 审计助手的编排核心：两级缓存、批量任务调度和多智能体会话协调。
//!
//! Orchestration core for an audit-management assistant: a strategy-driven two-tier
//! cache, a concurrency-bounded batch task scheduler and a multi-agent conversation
//! coordinator.
//!
//! ## Overview
//!
//! The crate is an in-process library. Text generation, durable storage and context
//! analysis are injected collaborators ([`batch::TaskProcessor`],
//! [`cache::DurableStore`], [`coordinator::ContextAnalyzer`]); this crate decides what
//! runs when, what is reused and who speaks next.
//!
//! ## Failure Model
//!
//! - **Cache**: durable-tier failures degrade to a miss or a no-op
//! - **Scheduler**: task failures become failed [`batch::BatchResult`]s; one result per task
//! - **Coordinator**: analyzer failures fall back to fixed defaults
//!
//! Only configuration and programmer errors are returned as [`Error`].
//!
//! ## Quick Start
//!
//! ```rust
//! use assist_orchestrator::batch::{processor_fn, Task};
//! use assist_orchestrator::coordinator::StaticContextAnalyzer;
//! use assist_orchestrator::{OrchestratorConfig, OrchestratorContext};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> assist_orchestrator::Result<()> {
//!     let config = OrchestratorConfig::from_yaml_str("scheduler:\n  batch_delay_ms: 0\n")?
//!         .apply_env_overrides();
//!     let ctx = OrchestratorContext::new(config, None)?;
//!
//!     let scheduler = ctx.scheduler(processor_fn(|p| async move { anyhow::Ok(json!({ "draft": p })) }))?;
//!     scheduler.add_task(Task::new("memo", json!("cash count")).with_cache_key("memo:cash")).await?;
//!     let results = scheduler.start_processing().await;
//!     assert!(results[0].success);
//!
//!     let coordinator = ctx.coordinator(Arc::new(StaticContextAnalyzer::default()))?;
//!     let roster = coordinator.recommend_roster("Cash count procedures").await;
//!     assert!(!roster.agents.is_empty());
//!
//!     ctx.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Two-tier strategy-driven cache |
//! | [`batch`] | Batch task scheduling with dependencies and retries |
//! | [`coordinator`] | Multi-agent conversation coordination |
//! | [`config`] | YAML configuration and environment overrides |
//! | [`context`] | Context object wiring the components together |

pub mod batch;
pub mod cache;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;

mod utils;

pub use config::OrchestratorConfig;
pub use context::OrchestratorContext;
pub use error::{Error, ErrorContext};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
