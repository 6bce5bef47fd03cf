//! Convenient imports: `use logoforge_dispatcher::prelude::*;`

pub use crate::dispatcher::{Dispatcher, MAX_NUM_PALETTES, MIN_NUM_PALETTES};
pub use crate::error::DispatcherError;
pub use crate::request::{GenerateRequest, RefineRequest};
