//! Convenient imports: `use logoforge_image_processor::prelude::*;`

pub use crate::convert::{convert, thumbnail, TargetFormat};
pub use crate::error::ImageProcessorError;
pub use crate::palette::{apply_palette, extract_palette};
