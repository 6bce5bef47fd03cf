//! Convenient imports: `use logoforge_task_registry::prelude::*;`

pub use crate::error::TaskRegistryError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::InMemoryTaskRegistry;
#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresTaskConfig, PostgresTaskRegistry};
pub use crate::traits::{TaskRegistry, TransitionPatch};
