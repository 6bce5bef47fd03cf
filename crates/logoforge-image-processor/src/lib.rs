//! Image Processor (C8): pure, synchronous byte-in/byte-out image
//! transforms used by the Worker and by the Export endpoint. No network
//! I/O, no async — every function here is a deterministic function of its
//! input bytes, which is what lets the Worker call it inline between
//! provider round-trips (spec.md §4.8).

pub mod convert;
pub mod error;
pub mod palette;
pub mod prelude;

pub use convert::{convert, thumbnail, TargetFormat};
pub use error::ImageProcessorError;
pub use palette::{apply_palette, extract_palette};
