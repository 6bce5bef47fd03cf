//! Message bus (spec.md §6): the Dispatcher publishes one `TaskMessage` per
//! enqueued Task; the Worker consumes, acking on success and nacking (or
//! letting the visibility timeout lapse) on transient failure to trigger
//! redelivery.

pub mod error;
#[cfg(feature = "in-memory")]
pub mod in_memory;
#[cfg(feature = "sqs")]
pub mod sqs;
pub mod traits;

pub mod prelude;

pub use error::BusError;
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryBus;
#[cfg(feature = "sqs")]
pub use sqs::{SqsBus, SqsBusConfig};
pub use traits::{BusConsumer, BusPublisher, DeliveredMessage, TaskMessage};
