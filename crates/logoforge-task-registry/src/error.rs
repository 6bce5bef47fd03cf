//! Unified error type for Task Registry (C5) operations.

use logoforge_domain::TaskStatus;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum TaskRegistryError {
    #[error("task not found: {0}")]
    NotFound(Uuid),

    /// The conditional `transition` primitive's CAS failed: the task was
    /// not in `expected` status when the update ran. This is the race a
    /// duplicate message delivery is expected to hit (spec.md §4.5, §8
    /// property 3) — callers branch on it rather than treating it as an
    /// internal error.
    #[error("transition conflict on task {task_id}: expected status {expected}, found {actual}")]
    TransitionConflict {
        task_id: Uuid,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// `create` rejected atomically: a non-terminal task already exists for
    /// this `(user_id, task_type)` (spec.md §3, §8 property 2). Every
    /// backend enforces this inside the same write that inserts the row —
    /// never as a separate `list_active` check the caller does itself —
    /// so two concurrent `create` calls for the same key can never both
    /// succeed (spec.md S3).
    #[error("an active task already exists for this user and task type")]
    ActiveTaskExists,

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TaskRegistryError {
    fn from(err: serde_json::Error) -> Self {
        TaskRegistryError::Serialization(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for TaskRegistryError {
    fn from(err: sqlx::Error) -> Self {
        TaskRegistryError::Database(err.to_string())
    }
}
