//! Convenient imports: `use logoforge_image_provider::prelude::*;`

pub use crate::error::ImageProviderError;
#[cfg(feature = "fake")]
pub use crate::fake::FakeImageProvider;
#[cfg(feature = "http")]
pub use crate::http::{HttpImageProvider, HttpImageProviderConfig};
pub use crate::traits::{ImageProvider, PaletteColors, ProposedPalette};
