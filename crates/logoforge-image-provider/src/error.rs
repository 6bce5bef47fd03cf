//! Error vocabulary for ImageProvider (C4) calls. Split into the two kinds
//! the Worker's retry policy branches on (spec.md §7): `Transient` errors
//! are safe to redeliver and retry; `Permanent` errors fail the Task
//! immediately.

#[derive(Debug, thiserror::Error)]
pub enum ImageProviderError {
    /// Network blip, provider 5xx, request timeout — the Worker retries via
    /// message redelivery.
    #[error("transient provider error: {0}")]
    Transient(String),

    /// Provider rejected the prompt or returned invalid image data —
    /// immediate Task failure, no retry.
    #[error("permanent provider error: {0}")]
    Permanent(String),
}

impl ImageProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImageProviderError::Transient(_))
    }
}
