//! Convenient imports: `use logoforge_bus::prelude::*;`

pub use crate::error::BusError;
#[cfg(feature = "in-memory")]
pub use crate::in_memory::InMemoryBus;
#[cfg(feature = "sqs")]
pub use crate::sqs::{SqsBus, SqsBusConfig};
pub use crate::traits::{BusConsumer, BusPublisher, DeliveredMessage, TaskMessage};
