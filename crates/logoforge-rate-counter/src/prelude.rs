//! Convenient imports: `use logoforge_rate_counter::prelude::*;`

#[cfg(feature = "dynamodb")]
pub use crate::dynamodb::{DynamoDbRateCounter, DynamoDbRateCounterConfig};
pub use crate::error::RateCounterError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::InMemoryRateCounter;
pub use crate::limits::{CategoryLimit, RateLimits};
pub use crate::traits::{CheckOutcome, RateCounter};
