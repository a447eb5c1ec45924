//! Batch results and processing statistics.

use super::task::TaskId;
use serde_json::Value;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a task ended without a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("processing failed: {message}")]
    Processing { message: String },

    #[error("processing timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    #[error("dependencies not completed within {}ms: {}", .waited.as_millis(), .missing.join(", "))]
    DependencyTimeout {
        missing: Vec<TaskId>,
        waited: Duration,
    },
}

impl TaskError {
    pub fn is_dependency_timeout(&self) -> bool {
        matches!(self, TaskError::DependencyTimeout { .. })
    }
}

/// Outcome of one submitted task. Exactly one is produced per task.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub task_id: TaskId,
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<TaskError>,
    pub duration: Duration,
    pub cache_hit: bool,
    /// Processing calls made, 0 for cache hits and dependency timeouts.
    pub attempts: u32,
    pub completed_at: Instant,
}

impl BatchResult {
    pub(crate) fn succeeded(
        task_id: TaskId,
        output: Value,
        duration: Duration,
        attempts: u32,
        cache_hit: bool,
    ) -> Self {
        Self {
            task_id,
            success: true,
            output: Some(output),
            error: None,
            duration,
            cache_hit,
            attempts,
            completed_at: Instant::now(),
        }
    }

    pub(crate) fn failed(task_id: TaskId, error: TaskError, duration: Duration, attempts: u32) -> Self {
        Self {
            task_id,
            success: false,
            output: None,
            error: Some(error),
            duration,
            cache_hit: false,
            attempts,
            completed_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingStats {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
    pub cached_tasks: usize,
    pub average_duration: Duration,
    /// Completed tasks per second of wall-clock run time.
    pub throughput: f64,
}

impl ProcessingStats {
    pub fn from_results(results: &[BatchResult], elapsed: Duration) -> Self {
        let total = results.len();
        let completed = results.iter().filter(|r| r.success).count();
        let cached = results.iter().filter(|r| r.cache_hit).count();
        let average_duration = if total == 0 {
            Duration::ZERO
        } else {
            results.iter().map(|r| r.duration).sum::<Duration>() / total as u32
        };
        let secs = elapsed.as_secs_f64();
        let throughput = if secs > 0.0 { completed as f64 / secs } else { 0.0 };
        Self {
            total_tasks: total,
            completed_tasks: completed,
            failed_tasks: total - completed,
            cached_tasks: cached,
            average_duration,
            throughput,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64
        }
    }
}
