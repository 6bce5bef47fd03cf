//! In-process fake bus: a FIFO queue plus an in-flight table, good enough
//! to exercise the Dispatcher→Worker handoff (including nack/redelivery)
//! in tests without a real queue service.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::BusError;
use crate::traits::{BusConsumer, BusPublisher, DeliveredMessage, TaskMessage};

struct InFlight {
    message: TaskMessage,
    delivery_count: u32,
}

struct Inner {
    queue: Mutex<VecDeque<(TaskMessage, u32)>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
    notify: Notify,
}

/// Shared, clonable in-memory bus. A single instance should be constructed
/// once and handed to both the Dispatcher (as a `BusPublisher`) and the
/// Worker (as a `BusConsumer`) so they see the same queue.
#[derive(Clone)]
pub struct InMemoryBus {
    inner: std::sync::Arc<Inner>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Inner {
                queue: Mutex::new(VecDeque::new()),
                in_flight: Mutex::new(HashMap::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Number of messages neither delivered-and-pending-ack nor acked.
    /// Exposed for tests asserting queue drains fully.
    pub fn pending_len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.inner.in_flight.lock().unwrap().len()
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusPublisher for InMemoryBus {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn publish(&self, message: &TaskMessage) -> Result<(), BusError> {
        self.inner.queue.lock().unwrap().push_back((message.clone(), 1));
        self.inner.notify.notify_one();
        Ok(())
    }
}

#[async_trait]
impl BusConsumer for InMemoryBus {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn receive(&self) -> Result<Option<DeliveredMessage>, BusError> {
        let popped = self.inner.queue.lock().unwrap().pop_front();
        let (message, delivery_count) = match popped {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let handle = Uuid::now_v7().to_string();
        self.inner
            .in_flight
            .lock()
            .unwrap()
            .insert(handle.clone(), InFlight { message: message.clone(), delivery_count });
        Ok(Some(DeliveredMessage { handle, message, delivery_count }))
    }

    async fn ack(&self, handle: &str) -> Result<(), BusError> {
        self.inner.in_flight.lock().unwrap().remove(handle);
        Ok(())
    }

    async fn nack(&self, handle: &str) -> Result<(), BusError> {
        let entry = self.inner.in_flight.lock().unwrap().remove(handle);
        match entry {
            Some(in_flight) => {
                self.inner.queue.lock().unwrap().push_back((in_flight.message, in_flight.delivery_count + 1));
                self.inner.notify.notify_one();
                Ok(())
            }
            None => Err(BusError::AckFailed {
                message_id: handle.to_string(),
                reason: "no in-flight message for this handle".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_domain::TaskMetadata;
    use uuid::Uuid;

    fn sample_message() -> TaskMessage {
        TaskMessage::new(
            Uuid::now_v7(),
            Uuid::now_v7(),
            TaskMetadata::Generate {
                logo_description: "a fox".into(),
                theme_description: "playful".into(),
                num_palettes: 3,
                partial_failures: vec![],
            },
        )
    }

    #[tokio::test]
    async fn publish_then_receive_round_trips_the_message() {
        let bus = InMemoryBus::new();
        let message = sample_message();
        bus.publish(&message).await.unwrap();

        let delivered = bus.receive().await.unwrap().expect("a message");
        assert_eq!(delivered.message.task_id, message.task_id);
        assert_eq!(delivered.delivery_count, 1);
        assert_eq!(bus.in_flight_len(), 1);
    }

    #[tokio::test]
    async fn receive_on_empty_queue_returns_none() {
        let bus = InMemoryBus::new();
        assert!(bus.receive().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_removes_the_in_flight_entry() {
        let bus = InMemoryBus::new();
        bus.publish(&sample_message()).await.unwrap();
        let delivered = bus.receive().await.unwrap().unwrap();
        bus.ack(&delivered.handle).await.unwrap();
        assert_eq!(bus.in_flight_len(), 0);
        assert_eq!(bus.pending_len(), 0);
    }

    #[tokio::test]
    async fn nack_requeues_with_an_incremented_delivery_count() {
        let bus = InMemoryBus::new();
        bus.publish(&sample_message()).await.unwrap();
        let first = bus.receive().await.unwrap().unwrap();
        bus.nack(&first.handle).await.unwrap();

        let second = bus.receive().await.unwrap().unwrap();
        assert_eq!(second.delivery_count, 2);
        assert_eq!(second.message.task_id, first.message.task_id);
    }

    #[tokio::test]
    async fn nack_on_unknown_handle_fails() {
        let bus = InMemoryBus::new();
        assert!(bus.nack("not-a-real-handle").await.is_err());
    }
}
