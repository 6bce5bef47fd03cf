//! The RateCounter gateway (C1): atomic check-and-decrement token buckets
//! keyed by `(user_id, category)` (spec.md §4.1). A naive read-modify-write
//! is explicitly not acceptable — every backend must perform the check and
//! the decrement as one atomic operation.

use async_trait::async_trait;
use logoforge_domain::RateCategory;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::RateCounterError;

/// Result of a `check_and_decrement` call (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_seconds: u64,
}

/// The RateCounter gateway (C1).
#[async_trait]
pub trait RateCounter: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Atomically check whether `cost` tokens remain in `(user_id,
    /// category)`'s bucket and, if so, decrement it. Lazily creates the
    /// bucket (at its configured limit) on first access, resetting on a
    /// wall-clock window boundary (spec.md §3 RateState).
    async fn check_and_decrement(
        &self,
        user_id: Uuid,
        category: RateCategory,
        cost: u32,
    ) -> Result<CheckOutcome, RateCounterError>;

    /// All category states for a user, for the client-visible limits
    /// endpoint (`GET /health/rate-limits`).
    async fn snapshot(&self, user_id: Uuid) -> Result<HashMap<RateCategory, CheckOutcome>, RateCounterError>;

    /// Compensating action: refund `n` tokens. Reserved for refunding a
    /// decrement on enqueue failure after the check has already succeeded;
    /// unused on the happy path (spec.md §4.1).
    async fn increment(&self, user_id: Uuid, category: RateCategory, n: u32) -> Result<(), RateCounterError>;
}
