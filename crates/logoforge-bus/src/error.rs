//! Error vocabulary for the message bus (spec.md §6).

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishFailed(String),

    #[error("failed to receive message: {0}")]
    ReceiveFailed(String),

    #[error("failed to acknowledge message {message_id}: {reason}")]
    AckFailed { message_id: String, reason: String },
}
