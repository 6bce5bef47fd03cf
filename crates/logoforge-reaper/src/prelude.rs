//! Common imports for consumers of this crate.

pub use crate::error::ReaperError;
pub use crate::sweep::{Reaper, SweepReport};
