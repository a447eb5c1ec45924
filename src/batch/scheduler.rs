//! Batch scheduler.

use super::collector::{partition, TaskQueue};
use super::completion::CompletionTable;
use super::result::{BatchResult, ProcessingStats, TaskError};
use super::retry::RetryPolicy;
use super::task::{Task, TaskId};
use crate::cache::CacheManager;
use crate::utils::duration_ms;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// The injected unit of work, e.g. an inference request.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, payload: &Value) -> anyhow::Result<Value>;
}

/// Adapts an async closure into a [`TaskProcessor`].
pub struct FnProcessor<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> TaskProcessor for FnProcessor<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Value>> + Send,
{
    async fn process(&self, payload: &Value) -> anyhow::Result<Value> {
        (self.f)(payload.clone()).await
    }
}

pub fn processor_fn<F, Fut>(f: F) -> Arc<dyn TaskProcessor>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(FnProcessor { f })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum in-flight processing calls within a batch.
    pub concurrency: usize,
    pub batch_size: usize,
    /// Pause between consecutive batches; zero disables it.
    #[serde(rename = "batch_delay_ms", with = "duration_ms")]
    pub batch_delay: Duration,
    #[serde(rename = "retry_base_delay_ms", with = "duration_ms")]
    pub retry_base_delay: Duration,
    /// Used for tasks that do not set their own.
    pub max_retries: u32,
    /// Used for tasks that do not set their own.
    #[serde(rename = "task_timeout_ms", with = "duration_ms")]
    pub task_timeout: Duration,
    /// Upper bound on waiting for dependencies.
    #[serde(rename = "dependency_timeout_ms", with = "duration_ms")]
    pub dependency_timeout: Duration,
    pub enable_caching: bool,
    pub cache_strategy: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            batch_size: 10,
            batch_delay: Duration::from_millis(100),
            retry_base_delay: Duration::from_millis(1000),
            max_retries: 3,
            task_timeout: Duration::from_secs(30),
            dependency_timeout: Duration::from_secs(30),
            enable_caching: true,
            cache_strategy: "task_results".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }
    pub fn with_batch_delay(mut self, d: Duration) -> Self {
        self.batch_delay = d;
        self
    }
    pub fn with_retry_base_delay(mut self, d: Duration) -> Self {
        self.retry_base_delay = d;
        self
    }
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }
    pub fn with_task_timeout(mut self, d: Duration) -> Self {
        self.task_timeout = d;
        self
    }
    pub fn with_dependency_timeout(mut self, d: Duration) -> Self {
        self.dependency_timeout = d;
        self
    }
    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }
    pub fn with_cache_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.cache_strategy = strategy.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let ctx = |field: &str| {
            ErrorContext::new()
                .with_field_path(format!("scheduler.{}", field))
                .with_component("scheduler_config")
        };
        if self.concurrency == 0 {
            return Err(Error::configuration_with_context(
                "concurrency must be at least 1",
                ctx("concurrency"),
            ));
        }
        if self.batch_size == 0 {
            return Err(Error::configuration_with_context(
                "batch_size must be at least 1",
                ctx("batch_size"),
            ));
        }
        Ok(())
    }
}

/// Runs submitted tasks in dependency/priority order, batch by batch.
///
/// - One [`BatchResult`] per submitted task, failures included
/// - Batches run sequentially; within a batch at most `concurrency` processing calls are in flight
/// - A cache hit skips both the dependency wait and the processing call
pub struct BatchScheduler {
    config: SchedulerConfig,
    processor: Arc<dyn TaskProcessor>,
    cache: Option<Arc<CacheManager>>,
    queue: TaskQueue,
    completed: CompletionTable,
    stats: Mutex<ProcessingStats>,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig, processor: Arc<dyn TaskProcessor>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            processor,
            cache: None,
            queue: TaskQueue::new(),
            completed: CompletionTable::new(),
            stats: Mutex::new(ProcessingStats::default()),
        })
    }

    pub fn with_cache(mut self, cache: Arc<CacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Queue tasks. Ids must be non-empty and unique across pending and completed tasks.
    pub async fn add_tasks(&self, tasks: Vec<Task>) -> Result<()> {
        let completed = self.completed.ids().await;
        let mut seen: HashSet<&str> = HashSet::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            let duplicate = !seen.insert(task.id.as_str())
                || completed.contains(&task.id)
                || self.queue.contains(&task.id);
            if task.id.is_empty() || duplicate {
                return Err(Error::validation_with_context(
                    if duplicate { "duplicate task id" } else { "empty task id" },
                    ErrorContext::new()
                        .with_field_path(format!("tasks[{}].id", i))
                        .with_details(task.id.clone())
                        .with_component("batch_scheduler"),
                ));
            }
        }
        let pending = self.queue.push_all(tasks);
        debug!(pending, "tasks queued");
        Ok(())
    }

    pub async fn add_task(&self, task: Task) -> Result<()> {
        self.add_tasks(vec![task]).await
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub async fn completed_ids(&self) -> HashSet<TaskId> {
        self.completed.ids().await
    }

    pub fn stats(&self) -> ProcessingStats {
        self.stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Drain the queue to completion. Returns exactly one result per drained task.
    pub async fn start_processing(&self) -> Vec<BatchResult> {
        let started = Instant::now();
        let ordered = self.queue.drain_ordered(&self.completed.ids().await);
        let total = ordered.len();
        let batches = partition(ordered, self.config.batch_size);
        let batch_count = batches.len();
        info!(tasks = total, batches = batch_count, "batch processing started");

        let limiter = Semaphore::new(self.config.concurrency);
        let mut results: Vec<BatchResult> = Vec::with_capacity(total);
        for (index, batch) in batches.into_iter().enumerate() {
            if index > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            debug!(batch = index, size = batch.len(), "batch started");
            let outcomes =
                futures::future::join_all(batch.into_iter().map(|t| self.run_task(t, &limiter))).await;
            results.extend(outcomes);
            self.publish_stats(&results, started.elapsed());
        }

        let stats = self.publish_stats(&results, started.elapsed());
        info!(
            total = stats.total_tasks,
            completed = stats.completed_tasks,
            failed = stats.failed_tasks,
            cached = stats.cached_tasks,
            throughput = stats.throughput,
            "batch processing finished"
        );
        results
    }

    fn publish_stats(&self, results: &[BatchResult], elapsed: Duration) -> ProcessingStats {
        let stats = ProcessingStats::from_results(results, elapsed);
        if let Ok(mut s) = self.stats.lock() {
            *s = stats.clone();
        }
        stats
    }

    fn cache(&self) -> Option<&CacheManager> {
        if self.config.enable_caching {
            self.cache.as_deref()
        } else {
            None
        }
    }

    async fn run_task(&self, mut task: Task, limiter: &Semaphore) -> BatchResult {
        let started = Instant::now();

        if let (Some(cache), Some(key)) = (self.cache(), task.cache_key.as_deref()) {
            if let Some(value) = cache.get(key, &self.config.cache_strategy).await {
                debug!(task = %task.id, key, "task served from cache");
                let result = BatchResult::succeeded(task.id.clone(), value, started.elapsed(), 0, true);
                self.completed.record(result.clone()).await;
                return result;
            }
        }

        if !task.dependencies.is_empty() {
            let missing = self
                .completed
                .wait_for(&task.dependencies, self.config.dependency_timeout)
                .await;
            if !missing.is_empty() {
                warn!(task = %task.id, missing = ?missing, "dependency wait timed out");
                let error = TaskError::DependencyTimeout {
                    missing,
                    waited: self.config.dependency_timeout,
                };
                return BatchResult::failed(task.id, error, started.elapsed(), 0);
            }
        }

        let policy = RetryPolicy::new(
            task.max_retries.unwrap_or(self.config.max_retries),
            self.config.retry_base_delay,
        );
        let timeout = task.timeout.unwrap_or(self.config.task_timeout);
        let mut attempts = 0u32;
        loop {
            let outcome = {
                let _permit = match limiter.acquire().await {
                    Ok(p) => p,
                    Err(_) => {
                        let error = TaskError::Processing {
                            message: "concurrency limiter closed".to_string(),
                        };
                        return BatchResult::failed(task.id, error, started.elapsed(), attempts);
                    }
                };
                attempts += 1;
                tokio::time::timeout(timeout, self.processor.process(&task.payload)).await
            };

            let error = match outcome {
                Ok(Ok(value)) => {
                    if let (Some(cache), Some(key)) = (self.cache(), task.cache_key.as_deref()) {
                        // Durable replication is best effort; the handle is not awaited.
                        let _ = cache
                            .set(key, value.clone(), &self.config.cache_strategy, None)
                            .await;
                    }
                    let result =
                        BatchResult::succeeded(task.id.clone(), value, started.elapsed(), attempts, false);
                    if !self.completed.record(result.clone()).await {
                        warn!(task = %task.id, "task already recorded as completed");
                    }
                    debug!(task = %task.id, attempts, "task completed");
                    return result;
                }
                Ok(Err(e)) => TaskError::Processing {
                    message: format!("{:#}", e),
                },
                Err(_) => TaskError::Timeout { after: timeout },
            };

            task.retry_count += 1;
            match policy.next_delay(task.retry_count) {
                Some(delay) => {
                    warn!(
                        task = %task.id,
                        retry = task.retry_count,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "task attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(task = %task.id, attempts, error = %error, "task failed after retries");
                    return BatchResult::failed(task.id, error, started.elapsed(), attempts);
                }
            }
        }
    }
}
