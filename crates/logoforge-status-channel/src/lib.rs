//! Status Channel (C9): local fan-out over a MetaStore `TaskChangeFeed`,
//! plus `PollingTaskChangeFeed` for backends without a native push
//! mechanism, plus a direct `get_task` fallback (spec.md §4.9).

pub mod channel;
pub mod error;
pub mod polling;
pub mod prelude;

pub use channel::{StatusChannel, TaskStatusNotification};
pub use error::StatusChannelError;
pub use polling::{PollingTaskChangeFeed, DEFAULT_POLL_INTERVAL};
