//! Bounded-concurrency fan-out for the Worker's parallel palette stage
//! (spec.md §4.7 step 2: "in parallel with a concurrency bound of 3").

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `f` over every item in `items`, with at most `limit` futures
/// in flight at once. Preserves input order in the returned `Vec`.
///
/// This is the one place the parallel palette stage's concurrency bound is
/// enforced; callers never spawn unbounded `tokio::spawn` per palette.
pub async fn bounded_for_each<I, F, Fut, T>(items: I, limit: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn preserves_order_despite_varied_delays() {
        let delays = [30u64, 10, 20, 0];
        let results = bounded_for_each(delays, 2, |d| async move {
            tokio::time::sleep(std::time::Duration::from_millis(d)).await;
            d
        })
        .await;
        assert_eq!(results, delays);
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let items: Vec<usize> = (0..9).collect();
        bounded_for_each(items, 3, |_| {
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;
        assert!(max_seen.load(Ordering::SeqCst) <= 3);
    }
}
