//! Pending-task queue.

use super::task::{Task, TaskId};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Holds submitted tasks until the scheduler drains them.
#[derive(Default)]
pub struct TaskQueue {
    items: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Task>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_all(&self, tasks: Vec<Task>) -> usize {
        let mut items = self.lock();
        items.extend(tasks);
        items.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|t| t.id == id)
    }

    /// Take every pending task in execution order: fewest unresolved dependencies
    /// first, then highest priority, then submission order.
    pub fn drain_ordered(&self, completed: &HashSet<TaskId>) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.lock().drain(..).collect();
        tasks.sort_by_cached_key(|t| {
            let unresolved = t
                .dependencies
                .iter()
                .filter(|d| !completed.contains(*d))
                .count();
            (unresolved, std::cmp::Reverse(t.priority))
        });
        tasks
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Split ordered tasks into consecutive batches of at most `batch_size`.
pub fn partition(tasks: Vec<Task>, batch_size: usize) -> Vec<Vec<Task>> {
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(tasks.len().div_ceil(size));
    let mut current = Vec::with_capacity(size);
    for task in tasks {
        current.push(task);
        if current.len() == size {
            batches.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::task::TaskPriority;
    use serde_json::json;

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_queue_empty() {
        let queue = TaskQueue::new();
        assert!(queue.is_empty());
        assert!(queue.drain_ordered(&HashSet::new()).is_empty());
    }

    #[test]
    fn test_order_by_dependencies_then_priority() {
        let queue = TaskQueue::new();
        queue.push_all(vec![
            Task::new("dep2", json!(null)).depends_on("x").depends_on("y"),
            Task::new("low", json!(null)).with_priority(TaskPriority::Low),
            Task::new("dep1", json!(null))
                .depends_on("low")
                .with_priority(TaskPriority::High),
            Task::new("high", json!(null)).with_priority(TaskPriority::High),
            Task::new("mid", json!(null)),
        ]);
        let ordered = queue.drain_ordered(&HashSet::new());
        assert_eq!(ids(&ordered), vec!["high", "mid", "low", "dep1", "dep2"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_completed_dependencies_not_counted() {
        let queue = TaskQueue::new();
        queue.push_all(vec![
            Task::new("b", json!(null)).depends_on("a"),
            Task::new("c", json!(null)).depends_on("zz").with_priority(TaskPriority::High),
        ]);
        let completed: HashSet<TaskId> = ["a".to_string()].into_iter().collect();
        assert_eq!(ids(&queue.drain_ordered(&completed)), vec!["b", "c"]);
    }

    #[test]
    fn test_stable_within_equal_keys() {
        let queue = TaskQueue::new();
        queue.push_all((0..5).map(|i| Task::new(format!("t{}", i), json!(i))).collect());
        assert_eq!(
            ids(&queue.drain_ordered(&HashSet::new())),
            vec!["t0", "t1", "t2", "t3", "t4"]
        );
    }

    #[test]
    fn test_partition() {
        let tasks: Vec<Task> = (0..7).map(|i| Task::new(format!("t{}", i), json!(i))).collect();
        let batches = partition(tasks, 3);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 1]);
        assert_eq!(ids(&batches[2]), vec!["t6"]);
        assert!(partition(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_queue_thread_safe() {
        use std::sync::Arc;
        use std::thread;

        let queue = Arc::new(TaskQueue::new());
        let mut handles = vec![];
        for i in 0..10 {
            let q = Arc::clone(&queue);
            handles.push(thread::spawn(move || {
                for j in 0..10 {
                    q.push_all(vec![Task::new(format!("{}-{}", i, j), json!(null))]);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(queue.len(), 100);
    }
}
