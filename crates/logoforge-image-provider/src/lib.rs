//! # ImageProvider client (C4)
//!
//! A synchronous HTTP call to the external AI image generation service
//! (spec.md §4.4). Treated as an opaque collaborator per spec.md §1; only
//! its required interface is specified here.

pub mod error;
#[cfg(feature = "fake")]
pub mod fake;
#[cfg(feature = "http")]
pub mod http;
pub mod prelude;
pub mod traits;

pub use error::ImageProviderError;
#[cfg(feature = "fake")]
pub use fake::FakeImageProvider;
#[cfg(feature = "http")]
pub use http::{HttpImageProvider, HttpImageProviderConfig};
pub use traits::{ImageProvider, PaletteColors, ProposedPalette};
