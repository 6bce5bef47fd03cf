//! A small, reusable hyper/tower HTTP server scaffold: a raw accept loop
//! plus a method+path router whose handlers close over a process-wide
//! `Services` value (spec.md §9 design note — "plain HTTP router with
//! explicit handler functions closing over a constructed `Services`
//! struct"; DI becomes constructor wiring at process start, not a
//! framework).
//!
//! `logoforge-api` builds its `Services` struct and registers routes on
//! top of this; nothing here knows about tasks, concepts, or rate limits.

pub mod cors;
pub mod json;
pub mod router;
pub mod server;

pub use cors::CorsLayer;
pub use json::{json_response, read_json_body, JsonError};
pub use router::{PathParams, Route, Router};
pub use server::{HttpServer, ServerConfig};
