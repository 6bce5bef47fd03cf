//! Shared error vocabulary (§7 Error Handling Design).
//!
//! Gateway and service crates define their own `thiserror` enums for
//! backend-specific failures; `DomainError` is the kind vocabulary the API
//! layer maps to HTTP status codes.

use thiserror::Error;

/// The error-kind taxonomy from §7. Not every crate needs every variant;
/// this is the superset the API layer switches on.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Bad input — surfaced as 4xx, not retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// 429 with reset info.
    #[error("rate limit exceeded")]
    RateLimited {
        limit: u32,
        current: u32,
        reset_after_seconds: u64,
    },

    /// 409 — active task of same type exists.
    #[error("an active task of this type already exists")]
    TaskConflict,

    /// 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network blip, provider 5xx, upload timeout — retried via message
    /// redelivery inside the Worker.
    #[error("transient external error: {0}")]
    Transient(String),

    /// Provider rejects prompt, invalid image data — immediate Task failure.
    #[error("permanent external error: {0}")]
    Permanent(String),

    /// Transition race, impossible state — logged at ERROR, not retried.
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Transient(_))
    }
}
