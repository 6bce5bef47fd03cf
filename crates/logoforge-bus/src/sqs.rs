//! SQS-backed bus. AWS wiring follows the same `aws_config`-bootstrapped
//! pattern as the other production gateways in this workspace; this crate
//! has no teacher counterpart, so the gateway-trait-plus-fake shape of
//! every other C1–C4 gateway is what's being imitated here.

use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::Client;

use async_trait::async_trait;

use crate::error::BusError;
use crate::traits::{BusConsumer, BusPublisher, DeliveredMessage, TaskMessage};

const LONG_POLL_WAIT_SECONDS: i32 = 10;
/// Matches `PROCESSING_TIMEOUT_S`'s order of magnitude loosely; the Worker
/// itself is the real timeout authority via the Task Registry transition,
/// this just keeps a crashed Worker from holding a message hostage for long.
const VISIBILITY_TIMEOUT_SECONDS: i32 = 300;

#[derive(Debug, Clone)]
pub struct SqsBusConfig {
    pub queue_url: String,
    pub region: String,
}

pub struct SqsBus {
    client: Client,
    queue_url: String,
}

impl SqsBus {
    pub async fn connect(config: SqsBusConfig) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .load()
            .await;
        Self {
            client: Client::new(&aws_config),
            queue_url: config.queue_url,
        }
    }
}

#[async_trait]
impl BusPublisher for SqsBus {
    fn backend_name(&self) -> &'static str {
        "sqs"
    }

    async fn publish(&self, message: &TaskMessage) -> Result<(), BusError> {
        let body = serde_json::to_string(message).map_err(|e| BusError::PublishFailed(e.to_string()))?;
        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| BusError::PublishFailed(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl BusConsumer for SqsBus {
    fn backend_name(&self) -> &'static str {
        "sqs"
    }

    async fn receive(&self) -> Result<Option<DeliveredMessage>, BusError> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .wait_time_seconds(LONG_POLL_WAIT_SECONDS)
            .visibility_timeout(VISIBILITY_TIMEOUT_SECONDS)
            .attribute_names(aws_sdk_sqs::types::QueueAttributeName::All)
            .send()
            .await
            .map_err(|e| BusError::ReceiveFailed(e.to_string()))?;

        let Some(sqs_message) = response.messages.unwrap_or_default().into_iter().next() else {
            return Ok(None);
        };

        let handle = sqs_message.receipt_handle.ok_or_else(|| {
            BusError::ReceiveFailed("SQS message missing receipt handle".into())
        })?;
        let body = sqs_message.body.ok_or_else(|| BusError::ReceiveFailed("SQS message missing body".into()))?;
        let message: TaskMessage =
            serde_json::from_str(&body).map_err(|e| BusError::ReceiveFailed(e.to_string()))?;
        let delivery_count = sqs_message
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get(&aws_sdk_sqs::types::MessageSystemAttributeName::ApproximateReceiveCount))
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(1);

        Ok(Some(DeliveredMessage { handle, message, delivery_count }))
    }

    async fn ack(&self, handle: &str) -> Result<(), BusError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(handle)
            .send()
            .await
            .map_err(|e| BusError::AckFailed { message_id: handle.to_string(), reason: e.to_string() })?;
        Ok(())
    }

    async fn nack(&self, handle: &str) -> Result<(), BusError> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(handle)
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|e| BusError::AckFailed { message_id: handle.to_string(), reason: e.to_string() })?;
        Ok(())
    }
}
