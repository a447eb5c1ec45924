//! 批量任务调度模块：按依赖和优先级分批执行任务，支持并发上限、重试和缓存短路。
//!
//! # Batch Task Scheduling Module
//!
//! Runs units of work (e.g. inference requests) in dependency and priority order,
//! with bounded concurrency, retries and cache short-circuiting.
//!
//! ## Overview
//!
//! - Tasks are ordered by unresolved-dependency count, then priority, then split
//!   into fixed-size batches that run strictly one after another
//! - Within a batch, a counting limiter bounds in-flight processing calls
//! - A fresh cache entry for a task's cache key skips the dependency wait and the call
//! - Dependents wait on a completion signal, bounded by a maximum wait
//! - Failed attempts retry with linear backoff; exhausted tasks yield failed results
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchScheduler`] | Queue, order and execute tasks |
//! | [`SchedulerConfig`] | Concurrency, batch size, delays, retry and timeout defaults |
//! | [`Task`] | Unit of work with priority, dependencies and cache key |
//! | [`TaskProcessor`] | Trait for the injected processing function |
//! | [`BatchResult`] | Per-task outcome |
//! | [`ProcessingStats`] | Aggregates for the last run |
//!
//! ## Example
//!
//! ```rust
//! use assist_orchestrator::batch::{processor_fn, BatchScheduler, SchedulerConfig, Task};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let processor = processor_fn(|payload| async move { anyhow::Ok(json!({ "answer": payload })) });
//! let scheduler = BatchScheduler::new(SchedulerConfig::new().with_concurrency(2), processor).unwrap();
//!
//! scheduler
//!     .add_tasks(vec![
//!         Task::new("extract", json!("ledger.csv")),
//!         Task::new("summarize", json!("ledger.csv")).depends_on("extract"),
//!     ])
//!     .await
//!     .unwrap();
//!
//! let results = scheduler.start_processing().await;
//! assert_eq!(results.len(), 2);
//! assert!(results.iter().all(|r| r.success));
//! # });
//! ```

mod collector;
mod completion;
mod result;
mod retry;
mod scheduler;
mod task;

pub use collector::{partition, TaskQueue};
pub use completion::CompletionTable;
pub use result::{BatchResult, ProcessingStats, TaskError};
pub use retry::RetryPolicy;
pub use scheduler::{processor_fn, BatchScheduler, FnProcessor, SchedulerConfig, TaskProcessor};
pub use task::{Task, TaskId, TaskPriority};
