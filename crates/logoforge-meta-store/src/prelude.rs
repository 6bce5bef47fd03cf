//! Convenient imports: `use logoforge_meta_store::prelude::*;`

pub use crate::change_feed::{TaskChangeEvent, TaskChangeFeed};
pub use crate::error::MetaStoreError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::{InMemoryConceptStore, InMemoryTaskChangeFeed};
#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConceptStore, PostgresMetaConfig, PostgresTaskChangeFeed};
pub use crate::traits::ConceptStore;
