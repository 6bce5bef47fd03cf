//! # Worker (C7)
//!
//! Consumes bus messages, claims Tasks via the race-free `transition`
//! primitive, and runs the generate/refine workflows (spec.md §4.7). This
//! crate is a library (`WorkerLoop`, exercised by in-memory-backed tests)
//! plus a `main.rs` binary that wires production backends and drives the
//! poll loop.

pub mod error;
pub mod prelude;
pub mod worker;
pub mod workflow;

pub use error::{WorkerError, WorkflowError};
pub use worker::{MessageOutcome, WorkerLoop, MAX_DELIVERY_ATTEMPTS};
