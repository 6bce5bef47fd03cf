//! # API surface (C11)
//!
//! The HTTP front door (spec.md §6): enqueue, task query, concept read, and
//! export endpoints. A thin layer over the Dispatcher, Task Registry,
//! MetaStore, BlobStore, RateCounter, and Status Channel gateways — this
//! crate owns request/response shaping and auth, not domain logic.

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod json;
pub mod prelude;
pub mod query;
pub mod router;
pub mod services;

pub use error::ApiError;
pub use router::build_router;
pub use services::Services;
