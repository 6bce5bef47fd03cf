//! `ApiError`: maps every domain error kind from spec.md §7 (Validation,
//! RateLimited, TaskConflict, NotFound, Transient, Permanent, Internal) to
//! an HTTP status code and the `{detail, details}` JSON envelope (§6
//! "Error response shape"). Same shape as a `MiddlewareError`-to-JSON-RPC-
//! error mapping table: constructors plus a `Display` impl, no silent
//! panics.

use hyper::StatusCode;
use logoforge_dispatcher::DispatcherError;
use logoforge_rate_counter::CheckOutcome;
use serde_json::json;

use crate::json::{error_response, ErrorBody};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing or malformed Authorization header")]
    Unauthorized,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("rate limit exceeded")]
    RateLimited(CheckOutcome),

    #[error("an active task of this type already exists")]
    TaskConflict,

    #[error("not found")]
    NotFound,

    #[error("upstream service error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::TaskConflict => StatusCode::CONFLICT,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::RateLimited(outcome) => ErrorBody {
                detail: "Rate limit exceeded".to_string(),
                details: Some(json!({
                    "limit": outcome.limit,
                    "current": outcome.limit.saturating_sub(outcome.remaining),
                    "period": period_label(outcome.reset_after_seconds),
                    "reset_after_seconds": outcome.reset_after_seconds,
                })),
                retry_after_seconds: Some(outcome.reset_after_seconds),
            },
            other => ErrorBody {
                detail: other.to_string(),
                details: None,
                retry_after_seconds: None,
            },
        }
    }

    pub fn into_response(self) -> hyper::Response<logoforge_http_server::json::Body> {
        error_response(self.status(), self.body())
    }
}

/// Coarse label for the `{details.period}` field (§6). Backends don't
/// expose their configured window directly in `CheckOutcome`, so this is
/// derived from the observed reset countdown rather than threaded through
/// as a separate field.
fn period_label(reset_after_seconds: u64) -> &'static str {
    if reset_after_seconds > 3600 {
        "day"
    } else {
        "hour"
    }
}

impl From<DispatcherError> for ApiError {
    fn from(error: DispatcherError) -> Self {
        match error {
            DispatcherError::Validation(message) => ApiError::Validation(message),
            DispatcherError::RateLimited(outcome) => ApiError::RateLimited(outcome),
            DispatcherError::TaskConflict => ApiError::TaskConflict,
            DispatcherError::RateCounter(err) => ApiError::Internal(err.to_string()),
            DispatcherError::TaskRegistry(err) => ApiError::Internal(err.to_string()),
            DispatcherError::PublishFailed(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<logoforge_task_registry::TaskRegistryError> for ApiError {
    fn from(error: logoforge_task_registry::TaskRegistryError) -> Self {
        use logoforge_task_registry::TaskRegistryError as E;
        match error {
            E::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<logoforge_meta_store::MetaStoreError> for ApiError {
    fn from(error: logoforge_meta_store::MetaStoreError) -> Self {
        use logoforge_meta_store::MetaStoreError as E;
        match error {
            E::NotFound(_) => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<logoforge_blob_store::BlobStoreError> for ApiError {
    fn from(error: logoforge_blob_store::BlobStoreError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<logoforge_image_processor::ImageProcessorError> for ApiError {
    fn from(error: logoforge_image_processor::ImageProcessorError) -> Self {
        ApiError::Validation(error.to_string())
    }
}

impl From<logoforge_status_channel::StatusChannelError> for ApiError {
    fn from(error: logoforge_status_channel::StatusChannelError) -> Self {
        ApiError::Internal(error.to_string())
    }
}

impl From<logoforge_rate_counter::RateCounterError> for ApiError {
    fn from(error: logoforge_rate_counter::RateCounterError) -> Self {
        ApiError::Internal(error.to_string())
    }
}
