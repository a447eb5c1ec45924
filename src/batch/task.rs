//! Task definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// A unit of work submitted to the [`BatchScheduler`](super::BatchScheduler).
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub payload: Value,
    pub priority: TaskPriority,
    /// Failed attempts so far.
    pub retry_count: u32,
    /// `None` falls back to the scheduler default.
    pub max_retries: Option<u32>,
    /// Per-attempt timeout; `None` falls back to the scheduler default.
    pub timeout: Option<Duration>,
    pub dependencies: Vec<TaskId>,
    pub cache_key: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, payload: Value) -> Self {
        Self {
            id: id.into(),
            payload,
            priority: TaskPriority::Medium,
            retry_count: 0,
            max_retries: None,
            timeout: None,
            dependencies: Vec::new(),
            cache_key: None,
            metadata: HashMap::new(),
        }
    }

    /// Task with a generated v4 UUID id.
    pub fn with_generated_id(payload: Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), payload)
    }

    pub fn with_priority(mut self, p: TaskPriority) -> Self {
        self.priority = p;
        self
    }
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }
    pub fn with_timeout(mut self, t: Duration) -> Self {
        self.timeout = Some(t);
        self
    }
    pub fn depends_on(mut self, id: impl Into<TaskId>) -> Self {
        self.dependencies.push(id.into());
        self
    }
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
