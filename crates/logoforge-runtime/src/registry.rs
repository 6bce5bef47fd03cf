//! In-process registry of live `CancellationHandle`s, keyed by `task_id`.
//!
//! The Worker (C7) registers a handle when it claims a task and drops it
//! once the workflow reaches a terminal outcome. This lets a single Worker
//! process track cancellation state for whichever tasks it currently owns
//! without round-tripping through the Task Registry on every stage check
//! (the Worker still re-reads `Task::is_cancelled` at coarser intervals —
//! see `logoforge-worker`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::cancellation::CancellationHandle;

/// Guarded by a single mutex; add/remove are O(1) (spec.md §5).
#[derive(Clone, Default)]
pub struct CancellationRegistry {
    handles: Arc<RwLock<HashMap<Uuid, CancellationHandle>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh handle for `task_id`, replacing any stale entry.
    pub async fn register(&self, task_id: Uuid) -> CancellationHandle {
        let handle = CancellationHandle::new();
        self.handles.write().await.insert(task_id, handle.clone());
        handle
    }

    /// Request cancellation of a tracked task. Returns `false` if the Worker
    /// is not currently tracking this task (already terminal, or owned by a
    /// different Worker process).
    pub async fn cancel(&self, task_id: Uuid) -> bool {
        match self.handles.read().await.get(&task_id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop tracking for a task once its workflow has reached a terminal
    /// outcome.
    pub async fn forget(&self, task_id: Uuid) {
        self.handles.write().await.remove(&task_id);
    }

    pub async fn is_tracked(&self, task_id: Uuid) -> bool {
        self.handles.read().await.contains_key(&task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_cancel_signals_handle() {
        let registry = CancellationRegistry::new();
        let task_id = Uuid::new_v4();
        let handle = registry.register(task_id).await;
        assert!(!handle.is_cancelled());
        assert!(registry.cancel(task_id).await);
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn cancel_unknown_task_returns_false() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn forget_removes_tracking() {
        let registry = CancellationRegistry::new();
        let task_id = Uuid::new_v4();
        registry.register(task_id).await;
        assert!(registry.is_tracked(task_id).await);
        registry.forget(task_id).await;
        assert!(!registry.is_tracked(task_id).await);
    }
}
