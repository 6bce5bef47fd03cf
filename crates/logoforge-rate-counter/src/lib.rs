//! # RateCounter gateway (C1)
//!
//! Atomic check-and-decrement token buckets per `(user_id, category)`
//! (spec.md §4.1). A naive read-modify-write is not acceptable; every
//! backend performs the check and the decrement as one atomic step.
//!
//! The system fails open on backend error: the Dispatcher treats a
//! `RateCounterError` as "allow, but log a warning" rather than blocking
//! enqueue on RateCounter availability.

pub mod error;
#[cfg(feature = "dynamodb")]
pub mod dynamodb;
#[cfg(feature = "in-memory")]
pub mod in_memory;
pub mod limits;
pub mod prelude;
pub mod traits;

pub use error::RateCounterError;
#[cfg(feature = "dynamodb")]
pub use dynamodb::{DynamoDbRateCounter, DynamoDbRateCounterConfig};
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryRateCounter;
pub use limits::{CategoryLimit, RateLimits};
pub use traits::{CheckOutcome, RateCounter};
