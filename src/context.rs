//! Explicit orchestration context.
//!
//! Owns the shared cache and its background sweeper, and wires schedulers and
//! coordinators to them. Build one per application and pass it to consumers.

use crate::batch::{BatchScheduler, TaskProcessor};
use crate::cache::{CacheManager, DurableStore, NullStore};
use crate::config::OrchestratorConfig;
use crate::coordinator::{ContextAnalyzer, ConversationCoordinator};
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct OrchestratorContext {
    config: OrchestratorConfig,
    cache: Arc<CacheManager>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl OrchestratorContext {
    /// Validate `config`, build the cache over `durable` (no durable tier when `None`) and
    /// start the expiry sweeper. Must be called from within a Tokio runtime.
    pub fn new(config: OrchestratorConfig, durable: Option<Arc<dyn DurableStore>>) -> Result<Self> {
        config.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(Error::runtime("orchestrator context requires a Tokio runtime"));
        }
        let durable = durable.unwrap_or_else(|| Arc::new(NullStore));
        let cache = Arc::new(CacheManager::new(config.cache.clone(), durable)?);
        let shutdown = CancellationToken::new();
        let sweeper = cache.spawn_sweeper(config.cache.sweep_interval, shutdown.child_token());
        info!(
            durable = cache.durable_name(),
            cache_enabled = cache.is_enabled(),
            concurrency = config.scheduler.concurrency,
            "orchestrator context started"
        );
        Ok(Self {
            config,
            cache,
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn cache(&self) -> Arc<CacheManager> {
        Arc::clone(&self.cache)
    }

    /// Scheduler over the shared cache. Caching is skipped when the scheduler config disables it.
    pub fn scheduler(&self, processor: Arc<dyn TaskProcessor>) -> Result<BatchScheduler> {
        let scheduler = BatchScheduler::new(self.config.scheduler.clone(), processor)?;
        Ok(if self.config.scheduler.enable_caching {
            scheduler.with_cache(self.cache())
        } else {
            scheduler
        })
    }

    pub fn coordinator(&self, analyzer: Arc<dyn ContextAnalyzer>) -> Result<ConversationCoordinator> {
        Ok(ConversationCoordinator::new(self.config.coordinator.clone(), analyzer)?.with_cache(self.cache()))
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.sweeper.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("orchestrator context stopped");
    }
}

impl Drop for OrchestratorContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
