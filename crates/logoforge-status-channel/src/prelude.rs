//! Convenient imports: `use logoforge_status_channel::prelude::*;`

pub use crate::channel::{StatusChannel, TaskStatusNotification};
pub use crate::error::StatusChannelError;
pub use crate::polling::{PollingTaskChangeFeed, DEFAULT_POLL_INTERVAL};
