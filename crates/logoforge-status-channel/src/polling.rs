//! Polling fallback (spec.md §4.9: "Also exposes a fallback polling path:
//! `get_task(task_id)` used when the change stream is unavailable"). This
//! is a `TaskChangeFeed` implementation in its own right, not just a direct
//! passthrough, so cross-process subscribers on a backend with no native
//! push (the in-memory Task Registry paired across processes, or any
//! deployment that prefers not to run a Postgres listener) can still use
//! the same `StatusChannel` fan-out.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use logoforge_domain::Task;
use logoforge_task_registry::TaskRegistry;
use uuid::Uuid;

use logoforge_meta_store::{TaskChangeEvent, TaskChangeFeed};

use crate::error::StatusChannelError;

/// How often `PollingTaskChangeFeed` re-reads the Task row while waiting
/// for a status change.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A `TaskChangeFeed` that has no push source of its own: `subscribe`
/// repeatedly calls `TaskRegistry::get` and synthesizes a `TaskChangeEvent`
/// whenever the observed status differs from the previous poll, closing
/// the stream once a terminal status is observed (or the task disappears).
pub struct PollingTaskChangeFeed<R: TaskRegistry> {
    registry: std::sync::Arc<R>,
    poll_interval: Duration,
}

impl<R: TaskRegistry> PollingTaskChangeFeed<R> {
    pub fn new(registry: std::sync::Arc<R>) -> Self {
        Self { registry, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    pub fn with_poll_interval(registry: std::sync::Arc<R>, poll_interval: Duration) -> Self {
        Self { registry, poll_interval }
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StatusChannelError> {
        self.registry.get(task_id).await.map_err(StatusChannelError::from)
    }
}

#[async_trait]
impl<R: TaskRegistry + 'static> TaskChangeFeed for PollingTaskChangeFeed<R> {
    /// Nothing to publish into: every event here is derived from polling,
    /// not pushed. Kept as a no-op so callers can treat every `TaskChangeFeed`
    /// uniformly.
    async fn publish(&self, _event: TaskChangeEvent) -> Result<(), logoforge_meta_store::MetaStoreError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        task_id: Uuid,
    ) -> Result<BoxStream<'static, TaskChangeEvent>, logoforge_meta_store::MetaStoreError> {
        let registry = self.registry.clone();
        let poll_interval = self.poll_interval;

        let stream = async_stream::stream! {
            let mut last_status = None;
            loop {
                let task = match registry.get(task_id).await {
                    Ok(Some(task)) => task,
                    Ok(None) => break,
                    Err(err) => {
                        tracing::error!(error = %err, %task_id, "polling task change feed failed to read task");
                        break;
                    }
                };

                if Some(task.status) != last_status {
                    let event = TaskChangeEvent {
                        task_id: task.task_id,
                        old_status: last_status,
                        new_status: task.status,
                        result_id: task.result_id,
                        error_message: task.error_message.clone(),
                    };
                    last_status = Some(task.status);
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        break;
                    }
                }

                tokio::time::sleep(poll_interval).await;
            }
        };

        Ok(Box::pin(stream))
    }
}
