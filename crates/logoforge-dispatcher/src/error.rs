//! Error vocabulary for the Dispatcher (C6).

use logoforge_bus::BusError;
use logoforge_rate_counter::{CheckOutcome, RateCounterError};
use logoforge_task_registry::TaskRegistryError;

#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Carries the full `CheckOutcome` so the API layer can fill the
    /// `{limit, current, period, reset_after_seconds}` response body and
    /// the `Retry-After` header (spec.md §6, §7).
    #[error("rate limit exceeded, resets in {}s", .0.reset_after_seconds)]
    RateLimited(CheckOutcome),

    /// spec.md §3/§8 property 2: at most one non-terminal task per
    /// `(user_id, task_type)`.
    #[error("an active task of this type already exists")]
    TaskConflict,

    #[error(transparent)]
    RateCounter(#[from] RateCounterError),

    #[error(transparent)]
    TaskRegistry(#[from] TaskRegistryError),

    /// Publish failed after the Task row was already created. Per spec.md
    /// §7's explicit design note, this is *not* surfaced as a request
    /// failure — the task stays `pending` and the Reaper reconciles it.
    /// Kept as a variant only so callers that want to know can inspect it;
    /// `Dispatcher::enqueue_*` does not return it as an `Err`.
    #[error("failed to publish task message: {0}")]
    PublishFailed(#[from] BusError),
}
