//! # MetaStore gateway (C2)
//!
//! CRUD over `Concept`/`Variation` records (spec.md §4.2), plus the Task
//! row change-feed consumed by the Status Channel (§4.9). Task status/result
//! mutation itself belongs to `logoforge-task-registry`, not here.

pub mod change_feed;
pub mod error;
#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod prelude;
pub mod traits;

#[cfg(test)]
mod parity_tests;

pub use change_feed::{TaskChangeEvent, TaskChangeFeed, POSTGRES_NOTIFY_CHANNEL};
pub use error::MetaStoreError;
#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryConceptStore, InMemoryTaskChangeFeed};
#[cfg(feature = "postgres")]
pub use postgres::{PostgresConceptStore, PostgresMetaConfig, PostgresTaskChangeFeed};
pub use traits::ConceptStore;
