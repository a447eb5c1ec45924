//! Completed-task table with a completion signal.

use super::result::BatchResult;
use super::task::TaskId;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Successful results keyed by task id. Dependents wait on it.
///
/// Every insert bumps a `watch` version so waiters re-check without polling.
pub struct CompletionTable {
    done: RwLock<HashMap<TaskId, BatchResult>>,
    version: watch::Sender<u64>,
}

impl Default for CompletionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionTable {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            done: RwLock::new(HashMap::new()),
            version,
        }
    }

    /// Record a result. Returns false if the id was already recorded; the first result wins.
    pub async fn record(&self, result: BatchResult) -> bool {
        {
            let mut done = self.done.write().await;
            if done.contains_key(&result.task_id) {
                return false;
            }
            done.insert(result.task_id.clone(), result);
        }
        self.version.send_modify(|v| *v += 1);
        true
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.done.read().await.contains_key(id)
    }

    pub async fn get(&self, id: &str) -> Option<BatchResult> {
        self.done.read().await.get(id).cloned()
    }

    pub async fn ids(&self) -> HashSet<TaskId> {
        self.done.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.done.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn missing(&self, ids: &[TaskId]) -> Vec<TaskId> {
        let done = self.done.read().await;
        ids.iter().filter(|id| !done.contains_key(*id)).cloned().collect()
    }

    /// Wait until every id is recorded, or `bound` elapses.
    ///
    /// Returns the ids still missing when the bound was hit; empty on success.
    pub async fn wait_for(&self, ids: &[TaskId], bound: Duration) -> Vec<TaskId> {
        let mut rx = self.version.subscribe();
        let deadline = tokio::time::Instant::now() + bound;
        loop {
            rx.borrow_and_update();
            let missing = self.missing(ids).await;
            if missing.is_empty() {
                return missing;
            }
            match tokio::time::timeout_at(deadline, rx.changed()).await {
                Ok(Ok(())) => continue,
                // Sender lives as long as `self`, so only the deadline ends the wait.
                Ok(Err(_)) | Err(_) => return self.missing(ids).await,
            }
        }
    }
}
