//! # Reaper (C10)
//!
//! Scheduled sweep that fails stalled tasks and deletes expired Concepts
//! (spec.md §4.10). A library (`Reaper::sweep_once`, exercised by
//! in-memory-backed tests) plus a `main.rs` binary that wires production
//! backends and drives the interval loop, matching
//! `turul-mcp-task-storage::postgres`'s `start_cleanup_task` shape.
//!
//! Runs as a single instance, or with a short-TTL distributed lease to
//! prevent overlap (spec.md §5) — this crate does not itself implement
//! leasing; `sweep_once` is idempotent (every mutation it performs is
//! itself a conditional `transition` or a cascade delete), so a brief
//! double-run under a lease handover is harmless rather than requiring a
//! distributed lock primitive.

pub mod error;
pub mod prelude;
pub mod sweep;

pub use error::ReaperError;
pub use sweep::{Reaper, SweepReport, PENDING_TIMEOUT_MESSAGE, PROCESSING_TIMEOUT_MESSAGE};
