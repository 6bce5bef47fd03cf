//! Convenient imports: `use logoforge_worker::prelude::*;`

pub use crate::error::{WorkerError, WorkflowError};
pub use crate::worker::{MessageOutcome, WorkerLoop, MAX_DELIVERY_ATTEMPTS};
