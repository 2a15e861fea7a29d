//! Registry of in-flight download tasks, backing /killall.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

/// Set of cancellation handles for running fetches.
///
/// Every dispatched fetch registers on start and deregisters when it settles,
/// whichever way it settles; the RAII guard makes the removal unconditional.
/// Handlers receive a clone of this instead of reaching for global state.
#[derive(Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    tasks: Mutex<HashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new task. The returned guard carries the task's
    /// cancellation token and removes the entry when dropped.
    pub fn register(&self) -> TaskGuard {
        self.insert(CancellationToken::new())
    }

    /// Register a task whose token follows a parent: cancelling the parent
    /// (or registering after it was cancelled) cancels this task too. Batch
    /// controllers use this so late-dispatched fetches cannot outlive a
    /// cancelled batch.
    pub fn register_child(&self, parent: &CancellationToken) -> TaskGuard {
        self.insert(parent.child_token())
    }

    fn insert(&self, token: CancellationToken) -> TaskGuard {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .tasks
            .lock()
            .unwrap()
            .insert(id, token.clone());
        TaskGuard {
            registry: self.clone(),
            id,
            token,
        }
    }

    /// Request cancellation of every task not already cancelled.
    /// Returns how many were actually cancelled.
    pub fn cancel_all(&self) -> usize {
        let tasks = self.inner.tasks.lock().unwrap();
        let mut cancelled = 0;
        for token in tasks.values() {
            if !token.is_cancelled() {
                token.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.inner.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.inner.tasks.lock().unwrap().remove(&id);
    }
}

/// RAII handle for one registered task.
pub struct TaskGuard {
    registry: TaskRegistry,
    id: u64,
    token: CancellationToken,
}

impl TaskGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.registry.remove(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_all_counts_running_tasks() {
        let registry = TaskRegistry::new();
        let guards: Vec<_> = (0..5).map(|_| registry.register()).collect();
        assert_eq!(registry.len(), 5);

        assert_eq!(registry.cancel_all(), 5);
        assert!(guards.iter().all(|g| g.token().is_cancelled()));

        // A second sweep finds nothing left to cancel.
        assert_eq!(registry.cancel_all(), 0);
    }

    #[test]
    fn test_registry_drains_when_tasks_settle() {
        let registry = TaskRegistry::new();
        let a = registry.register();
        let b = registry.register();
        assert_eq!(registry.len(), 2);

        drop(a);
        assert_eq!(registry.len(), 1);
        drop(b);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_child_guards_follow_parent_cancellation() {
        let registry = TaskRegistry::new();
        let batch = registry.register();
        let child = registry.register_child(batch.token());
        assert!(!child.token().is_cancelled());

        batch.token().cancel();
        assert!(child.token().is_cancelled());
    }

    #[test]
    fn test_late_child_sees_earlier_sweep() {
        let registry = TaskRegistry::new();
        let batch = registry.register();
        assert_eq!(registry.cancel_all(), 1);

        // Work dispatched after the sweep starts already cancelled.
        let late = registry.register_child(batch.token());
        assert!(late.token().is_cancelled());
    }

    #[test]
    fn test_guard_deregisters_even_when_cancelled() {
        let registry = TaskRegistry::new();
        let guard = registry.register();
        registry.cancel_all();
        drop(guard);
        assert!(registry.is_empty());
    }
}
