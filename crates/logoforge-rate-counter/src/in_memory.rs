//! In-memory RateCounter backend. Suitable for development, tests, and
//! single-instance deployments.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use logoforge_domain::RateCategory;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::RateCounterError;
use crate::limits::RateLimits;
use crate::traits::{CheckOutcome, RateCounter};

struct Bucket {
    remaining: u32,
    window_start: Instant,
}

/// The whole state lives behind one `Mutex`, which is what makes
/// `check_and_decrement` atomic: the check and the decrement happen while
/// holding the same guard, so no interleaved reader ever observes a bucket
/// between the two (spec.md §4.1: "a naive read-modify-write is not
/// acceptable").
#[derive(Default)]
pub struct InMemoryRateCounter {
    limits: RateLimits,
    buckets: Mutex<HashMap<(Uuid, RateCategory), Bucket>>,
}

impl InMemoryRateCounter {
    pub fn new() -> Self {
        Self {
            limits: RateLimits::default(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_limits(limits: RateLimits) -> Self {
        Self {
            limits,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn reset_after(window: Duration, window_start: Instant) -> u64 {
        let elapsed = window_start.elapsed();
        window.saturating_sub(elapsed).as_secs()
    }
}

#[async_trait]
impl RateCounter for InMemoryRateCounter {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn check_and_decrement(
        &self,
        user_id: Uuid,
        category: RateCategory,
        cost: u32,
    ) -> Result<CheckOutcome, RateCounterError> {
        let config = self.limits.for_category(category);
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry((user_id, category)).or_insert_with(|| Bucket {
            remaining: config.limit,
            window_start: Instant::now(),
        });

        if bucket.window_start.elapsed() >= config.window {
            bucket.remaining = config.limit;
            bucket.window_start = Instant::now();
        }

        let allowed = bucket.remaining >= cost;
        if allowed {
            bucket.remaining -= cost;
        }

        Ok(CheckOutcome {
            allowed,
            limit: config.limit,
            remaining: bucket.remaining,
            reset_after_seconds: Self::reset_after(config.window, bucket.window_start),
        })
    }

    async fn snapshot(&self, user_id: Uuid) -> Result<HashMap<RateCategory, CheckOutcome>, RateCounterError> {
        let mut buckets = self.buckets.lock().await;
        let mut snapshot = HashMap::new();
        for category in RateLimits::all_categories() {
            let config = self.limits.for_category(category);
            let bucket = buckets.entry((user_id, category)).or_insert_with(|| Bucket {
                remaining: config.limit,
                window_start: Instant::now(),
            });
            if bucket.window_start.elapsed() >= config.window {
                bucket.remaining = config.limit;
                bucket.window_start = Instant::now();
            }
            snapshot.insert(
                category,
                CheckOutcome {
                    allowed: bucket.remaining > 0,
                    limit: config.limit,
                    remaining: bucket.remaining,
                    reset_after_seconds: Self::reset_after(config.window, bucket.window_start),
                },
            );
        }
        Ok(snapshot)
    }

    async fn increment(&self, user_id: Uuid, category: RateCategory, n: u32) -> Result<(), RateCounterError> {
        let config = self.limits.for_category(category);
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry((user_id, category)).or_insert_with(|| Bucket {
            remaining: config.limit,
            window_start: Instant::now(),
        });
        bucket.remaining = (bucket.remaining + n).min(config.limit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_access_lazily_creates_bucket_at_limit() {
        let counter = InMemoryRateCounter::new();
        let user_id = Uuid::new_v4();
        let outcome = counter
            .check_and_decrement(user_id, RateCategory::GenerateConcept, 1)
            .await
            .unwrap();
        assert!(outcome.allowed);
        assert_eq!(outcome.remaining, outcome.limit - 1);
    }

    #[tokio::test]
    async fn denies_once_exhausted() {
        let counter = InMemoryRateCounter::with_limits(
            RateLimits::default().with_override(
                RateCategory::GenerateConcept,
                crate::limits::CategoryLimit { limit: 2, window: Duration::from_secs(3600) },
            ),
        );
        let user_id = Uuid::new_v4();
        for _ in 0..2 {
            let outcome = counter.check_and_decrement(user_id, RateCategory::GenerateConcept, 1).await.unwrap();
            assert!(outcome.allowed);
        }
        let denied = counter.check_and_decrement(user_id, RateCategory::GenerateConcept, 1).await.unwrap();
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[tokio::test]
    async fn increment_refunds_up_to_limit() {
        let counter = InMemoryRateCounter::with_limits(
            RateLimits::default().with_override(
                RateCategory::GenerateConcept,
                crate::limits::CategoryLimit { limit: 5, window: Duration::from_secs(3600) },
            ),
        );
        let user_id = Uuid::new_v4();
        counter.check_and_decrement(user_id, RateCategory::GenerateConcept, 3).await.unwrap();
        counter.increment(user_id, RateCategory::GenerateConcept, 10).await.unwrap();
        let outcome = counter.check_and_decrement(user_id, RateCategory::GenerateConcept, 0).await.unwrap();
        assert_eq!(outcome.remaining, 5);
    }

    /// Property 5 (spec.md §8): under K concurrent dispatches against a
    /// bucket with limit L<K, exactly L succeed.
    #[tokio::test]
    async fn concurrent_dispatch_admits_exactly_the_limit() {
        let limit = 5u32;
        let concurrency = 20u32;
        let counter = Arc::new(InMemoryRateCounter::with_limits(RateLimits::default().with_override(
            RateCategory::GenerateConcept,
            crate::limits::CategoryLimit { limit, window: Duration::from_secs(3600) },
        )));
        let user_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..concurrency {
            let counter = Arc::clone(&counter);
            handles.push(tokio::spawn(async move {
                counter.check_and_decrement(user_id, RateCategory::GenerateConcept, 1).await.unwrap()
            }));
        }
        let results = futures::future::join_all(handles).await;
        let admitted = results.into_iter().filter(|r| r.as_ref().unwrap().allowed).count();
        assert_eq!(admitted, limit as usize);
    }

    #[tokio::test]
    async fn snapshot_covers_every_category() {
        let counter = InMemoryRateCounter::new();
        let user_id = Uuid::new_v4();
        let snapshot = counter.snapshot(user_id).await.unwrap();
        assert_eq!(snapshot.len(), RateLimits::all_categories().len());
    }
}
