//! The Task row change-feed (spec.md §4.2, §4.9): a push notification fired
//! whenever a Task's status changes, filtered by `task_id` for the Status
//! Channel's subscribers.
//!
//! The Postgres channel name below is a convention shared with
//! `logoforge-task-registry`'s `transition()`, which fires
//! `pg_notify('logoforge_task_changes', ...)` on every successful CAS update.
//! The two crates are not otherwise coupled: MetaStore only knows the
//! channel name, not the Task Registry's schema.
pub const POSTGRES_NOTIFY_CHANNEL: &str = "logoforge_task_changes";

use async_trait::async_trait;
use futures::stream::BoxStream;
use logoforge_domain::TaskStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MetaStoreError;

/// Emitted for every observed Task status transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskChangeEvent {
    pub task_id: Uuid,
    pub old_status: Option<TaskStatus>,
    pub new_status: TaskStatus,
    pub result_id: Option<Uuid>,
    pub error_message: Option<String>,
}

impl TaskChangeEvent {
    pub fn is_terminal(&self) -> bool {
        self.new_status.is_terminal()
    }
}

/// A source of Task change events. `publish` is called by whichever
/// component observed the transition; `subscribe` returns a stream scoped to
/// one `task_id`, closed by the implementation once a terminal event has
/// been delivered.
#[async_trait]
pub trait TaskChangeFeed: Send + Sync {
    async fn publish(&self, event: TaskChangeEvent) -> Result<(), MetaStoreError>;

    async fn subscribe(&self, task_id: Uuid) -> Result<BoxStream<'static, TaskChangeEvent>, MetaStoreError>;
}
