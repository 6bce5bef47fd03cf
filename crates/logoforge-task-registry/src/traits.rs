//! The Task Registry (C5) trait: the only component allowed to mutate a
//! Task's `status`, `result_id`, and `error_message` (spec.md §4.5, §9
//! design note "Task state mutation scattered across services").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logoforge_domain::{Task, TaskMetadata, TaskStatus, TaskType};
use uuid::Uuid;

use crate::error::TaskRegistryError;

/// Fields a `transition` call may set alongside the status change. Every
/// field is optional so a single `transition` signature covers both
/// `processing → completed` (sets `result_id`) and `processing → failed`
/// (sets `error_message`).
#[derive(Debug, Clone, Default)]
pub struct TransitionPatch {
    pub result_id: Option<Uuid>,
    pub error_message: Option<String>,
    /// Replace `metadata` wholesale — used to record `partial_failures`
    /// (spec.md §4.7 workflow step 3, S5) without a separate RMW round trip
    /// from the caller's perspective (the backend still does one internally).
    pub metadata: Option<TaskMetadata>,
}

impl TransitionPatch {
    pub fn completed(result_id: Uuid) -> Self {
        Self {
            result_id: Some(result_id),
            ..Default::default()
        }
    }

    pub fn completed_with_metadata(result_id: Uuid, metadata: TaskMetadata) -> Self {
        Self {
            result_id: Some(result_id),
            metadata: Some(metadata),
            ..Default::default()
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            error_message: Some(logoforge_domain::clamp_error_message(error_message)),
            ..Default::default()
        }
    }
}

/// The Task Registry (C5).
#[async_trait]
pub trait TaskRegistry: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Insert a new Task with `status = pending` (spec.md §4.5). Atomically
    /// enforces the at-most-one-active rule (spec.md §3, §8 property 2):
    /// fails with `ActiveTaskExists` if a non-terminal task already exists
    /// for this `(user_id, task_type)`, in the same write that would
    /// otherwise insert the row — not as a separate check-then-act step a
    /// caller performs itself, which is what keeps two concurrent `create`
    /// calls for the same key from both succeeding (spec.md S3).
    async fn create(&self, user_id: Uuid, metadata: TaskMetadata) -> Result<Task, TaskRegistryError>;

    async fn get(&self, task_id: Uuid) -> Result<Option<Task>, TaskRegistryError>;

    /// The fundamental concurrency primitive (spec.md §4.5): a conditional
    /// update that fails with `TransitionConflict` if the task's current
    /// status is not `from`. Race-free under at-least-once delivery —
    /// exactly one of N concurrent callers for the same `(task_id, from,
    /// to)` triple succeeds.
    async fn transition(
        &self,
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        patch: TransitionPatch,
    ) -> Result<Task, TaskRegistryError>;

    /// Non-terminal tasks for `(user_id, task_type)`, used by the
    /// Dispatcher to enforce the at-most-one-active rule (spec.md §3, §8
    /// property 2).
    async fn list_active(&self, user_id: Uuid, task_type: TaskType) -> Result<Vec<Task>, TaskRegistryError>;

    /// Caller's tasks, optionally filtered, newest first, capped at `limit`
    /// (§6 `GET /tasks`).
    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<TaskStatus>,
        task_type: Option<TaskType>,
        limit: u32,
    ) -> Result<Vec<Task>, TaskRegistryError>;

    /// Idempotently set `is_cancelled = true` (§5 cancellation semantics;
    /// §8 "cancel idempotency" round-trip law). Returns the task as it
    /// stands after the flag is set; does not itself transition status —
    /// the Worker observes the flag between stages.
    async fn set_cancelled(&self, task_id: Uuid) -> Result<Task, TaskRegistryError>;

    /// The Reaper's sweep (§4.10): every task in `status` whose `since`
    /// timestamp (`updated_at` for processing, `created_at` for pending)
    /// is older than `older_than`, transitioned to `failed` with
    /// `error_message`. Returns the transitioned task ids.
    async fn mark_failed_if_stale(
        &self,
        status: TaskStatus,
        older_than: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, TaskRegistryError>;
}
