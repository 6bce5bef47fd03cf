//! Local fan-out over a single upstream `TaskChangeFeed` subscription
//! (spec.md §4.9). Several HTTP callers can long-poll or stream the same
//! `task_id` concurrently; rather than opening one upstream subscription
//! (one `PgListener`, one poll loop) per caller, `StatusChannel` keeps a
//! single subscriber map — guarded by one mutex, matching the "single
//! source of truth per key" shape `logoforge-runtime::CancellationRegistry`
//! uses for cancellation handles — and lazily starts exactly one upstream
//! pump per `task_id`, torn down once the task reaches a terminal status.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use logoforge_domain::Task;
use logoforge_meta_store::{TaskChangeEvent, TaskChangeFeed};
use logoforge_task_registry::TaskRegistry;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StatusChannelError;

/// Typed notification delivered to a subscriber (spec.md §4.9). Identical
/// in shape to `TaskChangeEvent` — kept as an alias rather than a
/// near-duplicate struct since the Status Channel adds no fields of its
/// own, only fan-out.
pub type TaskStatusNotification = TaskChangeEvent;

/// Broadcast channel capacity per task. Sized for a handful of concurrent
/// watchers of one task; a slow subscriber that falls this far behind sees
/// `RecvError::Lagged` rather than unbounded memory growth.
const SUBSCRIBER_CAPACITY: usize = 32;

struct Inner<F, R> {
    feed: Arc<F>,
    registry: Arc<R>,
    fanouts: Mutex<HashMap<Uuid, broadcast::Sender<TaskStatusNotification>>>,
}

/// The Status Channel (C9). Generic over the concrete `TaskChangeFeed` and
/// `TaskRegistry` backends so a process can wire in Postgres LISTEN,
/// `PollingTaskChangeFeed`, or the in-memory fake without boxing.
pub struct StatusChannel<F, R> {
    inner: Arc<Inner<F, R>>,
}

impl<F, R> Clone for StatusChannel<F, R> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<F, R> StatusChannel<F, R>
where
    F: TaskChangeFeed + 'static,
    R: TaskRegistry + 'static,
{
    pub fn new(feed: Arc<F>, registry: Arc<R>) -> Self {
        Self {
            inner: Arc::new(Inner { feed, registry, fanouts: Mutex::new(HashMap::new()) }),
        }
    }

    /// Subscribe to status updates for `task_id`. The first caller for a
    /// given `task_id` starts the upstream pump; later callers share it.
    pub fn subscribe(&self, task_id: Uuid) -> broadcast::Receiver<TaskStatusNotification> {
        let mut fanouts = self.inner.fanouts.lock().unwrap();
        if let Some(sender) = fanouts.get(&task_id) {
            return sender.subscribe();
        }

        let (sender, receiver) = broadcast::channel(SUBSCRIBER_CAPACITY);
        fanouts.insert(task_id, sender.clone());
        drop(fanouts);

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut stream = match inner.feed.subscribe(task_id).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::error!(error = %err, %task_id, "status channel failed to open upstream subscription");
                    inner.fanouts.lock().unwrap().remove(&task_id);
                    return;
                }
            };
            use futures::StreamExt;
            while let Some(event) = stream.next().await {
                let terminal = event.is_terminal();
                // Send errors mean every receiver dropped; nothing left to do.
                let _ = sender.send(event);
                if terminal {
                    break;
                }
            }
            inner.fanouts.lock().unwrap().remove(&task_id);
        });

        receiver
    }

    /// Fallback direct read (spec.md §4.9), used by `GET /tasks/{task_id}`
    /// and by any caller that would rather poll once than hold a stream.
    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, StatusChannelError> {
        self.inner.registry.get(task_id).await.map_err(StatusChannelError::from)
    }

    /// Number of task ids with a live upstream pump. Exposed for tests
    /// asserting the fan-out tears itself down after a terminal event.
    pub fn active_pump_count(&self) -> usize {
        self.inner.fanouts.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_domain::{TaskMetadata, TaskStatus};
    use logoforge_meta_store::InMemoryTaskChangeFeed;
    use logoforge_task_registry::{InMemoryTaskRegistry, TransitionPatch};
    use std::time::Duration;

    #[tokio::test]
    async fn two_subscribers_share_one_upstream_pump_and_both_see_the_event() {
        let feed = Arc::new(InMemoryTaskChangeFeed::new());
        let registry = Arc::new(InMemoryTaskRegistry::new());
        let channel = StatusChannel::new(feed.clone(), registry);

        let task_id = Uuid::now_v7();
        let mut first = channel.subscribe(task_id);
        let mut second = channel.subscribe(task_id);
        assert_eq!(channel.active_pump_count(), 1);

        feed.publish(TaskChangeEvent {
            task_id,
            old_status: Some(TaskStatus::Pending),
            new_status: TaskStatus::Processing,
            result_id: None,
            error_message: None,
        })
        .await
        .unwrap();

        let seen_first = first.recv().await.unwrap();
        let seen_second = second.recv().await.unwrap();
        assert_eq!(seen_first.new_status, TaskStatus::Processing);
        assert_eq!(seen_second.new_status, TaskStatus::Processing);
    }

    #[tokio::test]
    async fn pump_tears_down_after_a_terminal_event() {
        let feed = Arc::new(InMemoryTaskChangeFeed::new());
        let registry = Arc::new(InMemoryTaskRegistry::new());
        let channel = StatusChannel::new(feed.clone(), registry);

        let task_id = Uuid::now_v7();
        let mut subscriber = channel.subscribe(task_id);

        feed.publish(TaskChangeEvent {
            task_id,
            old_status: Some(TaskStatus::Processing),
            new_status: TaskStatus::Completed,
            result_id: Some(Uuid::now_v7()),
            error_message: None,
        })
        .await
        .unwrap();

        assert!(subscriber.recv().await.is_ok());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(channel.active_pump_count(), 0);
    }

    #[tokio::test]
    async fn get_task_reads_through_to_the_registry() {
        let feed = Arc::new(InMemoryTaskChangeFeed::new());
        let registry = Arc::new(InMemoryTaskRegistry::new());
        let task = registry
            .create(
                Uuid::now_v7(),
                TaskMetadata::Generate {
                    logo_description: "owl".into(),
                    theme_description: "modern".into(),
                    num_palettes: 3,
                    partial_failures: vec![],
                },
            )
            .await
            .unwrap();
        let channel = StatusChannel::new(feed, registry);

        let fetched = channel.get_task(task.task_id).await.unwrap().expect("task present");
        assert_eq!(fetched.task_id, task.task_id);
    }
}
