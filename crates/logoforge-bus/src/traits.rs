//! The message bus (spec.md §6): the Dispatcher publishes one message per
//! enqueued Task; the Worker consumes messages and drives the Task state
//! machine in `logoforge-worker`. Publisher and consumer are split into two
//! narrow traits — the Dispatcher only ever needs the former, the Worker
//! only the latter — but both in-process backends here implement both,
//! since they share one underlying queue.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logoforge_domain::{TaskMetadata, TaskType};
use uuid::Uuid;

use crate::error::BusError;

/// Wire payload published by the Dispatcher (spec.md §6 "Message bus
/// payload"). Duplicative of the Task row's `metadata` by design — the
/// Worker re-reads the row after claiming and treats this as a hint, not a
/// source of truth.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskMessage {
    pub task_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub payload: TaskMetadata,
    pub enqueued_at: DateTime<Utc>,
}

impl TaskMessage {
    pub fn new(task_id: Uuid, user_id: Uuid, payload: TaskMetadata) -> Self {
        Self {
            task_id,
            user_id,
            task_type: payload.task_type(),
            payload,
            enqueued_at: Utc::now(),
        }
    }
}

/// A message handed to a consumer, carrying enough to ack/nack it and to
/// know how many times redelivery has already happened (spec.md §7: up to
/// 5 redelivery attempts before a transient failure becomes permanent).
#[derive(Debug, Clone)]
pub struct DeliveredMessage {
    /// Backend-specific receipt handle (SQS receipt handle; a UUID for the
    /// in-memory backend). Required to ack/nack this specific delivery.
    pub handle: String,
    pub message: TaskMessage,
    /// 1 on first delivery, incremented on every nack/redelivery.
    pub delivery_count: u32,
}

#[async_trait]
pub trait BusPublisher: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn publish(&self, message: &TaskMessage) -> Result<(), BusError>;
}

#[async_trait]
pub trait BusConsumer: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Long-poll for the next message, or `None` if none arrived within the
    /// backend's wait window. Does not remove the message — callers must
    /// `ack` or `nack` it.
    async fn receive(&self) -> Result<Option<DeliveredMessage>, BusError>;

    /// Durably remove a message after successful processing.
    async fn ack(&self, handle: &str) -> Result<(), BusError>;

    /// Make a message available for redelivery immediately (used when the
    /// Worker observes a transient failure and wants faster retry than
    /// waiting out the visibility timeout).
    async fn nack(&self, handle: &str) -> Result<(), BusError>;
}
