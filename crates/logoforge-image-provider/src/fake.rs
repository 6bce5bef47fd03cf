//! Deterministic in-memory ImageProvider fake, used by tests and local dev
//! (spec.md §9: "a production implementation and an in-memory fake used by
//! tests"). Produces real, decodable PNG bytes (solid-color squares tinted
//! by the requested palette) so downstream Image Processor and Worker tests
//! can exercise genuine image decode/encode paths without a network call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use logoforge_domain::PreserveAspect;

use crate::error::ImageProviderError;
use crate::traits::{ImageProvider, PaletteColors, ProposedPalette};

const FAKE_IMAGE_DIM: u32 = 64;

/// Named palettes cycled through by `propose_palettes`, grounded in the
/// spec's own example names (spec.md S1: `"Forest"`, `"Cream"`).
const PALETTE_NAMES: &[&str] = &[
    "Forest", "Cream", "Sunset", "Midnight", "Coral", "Sage", "Slate", "Ember", "Glacier",
];
const PALETTE_SEED_COLORS: &[[&str; 5]] = &[
    ["#1b4332", "#2d6a4f", "#52b788", "#b7e4c7", "#d8f3dc"],
    ["#f5ebe0", "#e3d5ca", "#d5bdaf", "#e8e8e4", "#b0a296"],
    ["#ff6b35", "#f7c59f", "#efefd0", "#004e89", "#1a659e"],
    ["#03071e", "#370617", "#6a040f", "#9d0208", "#d00000"],
    ["#ff595e", "#ffca3a", "#8ac926", "#1982c4", "#6a4c93"],
    ["#606c38", "#283618", "#fefae0", "#dda15e", "#bc6c25"],
    ["#2b2d42", "#8d99ae", "#edf2f4", "#ef233c", "#d90429"],
    ["#9a031e", "#5f0f40", "#fb8b24", "#e36414", "#0f4c5c"],
    ["#caf0f8", "#90e0ef", "#00b4d8", "#0077b6", "#03045e"],
];

fn parse_hex(color: &str) -> Rgb<u8> {
    let color = color.trim_start_matches('#');
    let bytes = u32::from_str_radix(color, 16).unwrap_or(0x808080);
    Rgb([((bytes >> 16) & 0xff) as u8, ((bytes >> 8) & 0xff) as u8, (bytes & 0xff) as u8])
}

fn render_png(color: Rgb<u8>) -> Result<Vec<u8>, ImageProviderError> {
    let image = RgbImage::from_pixel(FAKE_IMAGE_DIM, FAKE_IMAGE_DIM, color);
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| ImageProviderError::Permanent(format!("failed to encode fake image: {e}")))?;
    Ok(bytes.into_inner())
}

/// Deterministic fake. Set `fail_on` to make a specific 0-indexed
/// `generate` call permanently fail, used to exercise the partial-failure
/// workflow path (spec.md S5).
pub struct FakeImageProvider {
    call_count: AtomicUsize,
    fail_on_calls: Mutex<Vec<usize>>,
}

impl FakeImageProvider {
    pub fn new() -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            fail_on_calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the `index`-th (0-based) call to `generate` fail permanently.
    /// Used to simulate spec.md S5 ("Mock ImageProvider to fail the 2nd of
    /// 3 palette calls permanently").
    pub fn fail_on_call(&self, index: usize) {
        self.fail_on_calls.lock().unwrap().push(index);
    }
}

impl Default for FakeImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageProvider for FakeImageProvider {
    fn backend_name(&self) -> &'static str {
        "fake"
    }

    async fn generate(
        &self,
        logo_description: &str,
        theme_description: &str,
        palette_colors: PaletteColors,
    ) -> Result<Vec<u8>, ImageProviderError> {
        let call_index = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_calls.lock().unwrap().contains(&call_index) {
            return Err(ImageProviderError::Permanent(format!(
                "provider rejected prompt for '{logo_description}' / '{theme_description}'"
            )));
        }
        let tint = palette_colors.as_ref().and_then(|c| c.first()).map(|c| parse_hex(c)).unwrap_or(Rgb([120, 120, 120]));
        render_png(tint)
    }

    async fn refine(
        &self,
        base_bytes: &[u8],
        instructions: &str,
        _preserve_aspects: &[PreserveAspect],
        _updated_logo_description: Option<&str>,
        _updated_theme_description: Option<&str>,
    ) -> Result<Vec<u8>, ImageProviderError> {
        if instructions.trim().is_empty() {
            return Err(ImageProviderError::Permanent("empty refinement instructions".into()));
        }
        if base_bytes.is_empty() {
            render_png(Rgb([200, 200, 200]))
        } else {
            // Return a recognizably-different tint, as a real refine call
            // would, while staying deterministic.
            render_png(Rgb([90, 90, 200]))
        }
    }

    async fn propose_palettes(
        &self,
        _logo_description: &str,
        _theme_description: &str,
        n: u8,
    ) -> Result<Vec<ProposedPalette>, ImageProviderError> {
        // `n` is the total variation count including the caller-supplied
        // "Original" (spec.md S1); this returns the `n - 1` named palettes.
        let named_count = n.saturating_sub(1) as usize;
        Ok((0..named_count)
            .map(|i| ProposedPalette {
                name: PALETTE_NAMES[i % PALETTE_NAMES.len()].to_string(),
                colors: PALETTE_SEED_COLORS[i % PALETTE_SEED_COLORS.len()].iter().map(|c| c.to_string()).collect(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generate_produces_decodable_png() {
        let provider = FakeImageProvider::new();
        let bytes = provider.generate("a fox", "forest", None).await.unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), FAKE_IMAGE_DIM);
    }

    #[tokio::test]
    async fn propose_palettes_returns_n_minus_one_named_palettes() {
        let provider = FakeImageProvider::new();
        let palettes = provider.propose_palettes("a fox", "forest", 3).await.unwrap();
        assert_eq!(palettes.len(), 2);
        for palette in &palettes {
            assert_eq!(palette.colors.len(), 5);
        }
    }

    #[tokio::test]
    async fn fail_on_call_fails_only_that_call() {
        let provider = FakeImageProvider::new();
        provider.fail_on_call(1);
        assert!(provider.generate("a", "b", None).await.is_ok());
        assert!(provider.generate("a", "b", None).await.is_err());
        assert!(provider.generate("a", "b", None).await.is_ok());
    }

    #[tokio::test]
    async fn refine_rejects_empty_instructions() {
        let provider = FakeImageProvider::new();
        assert!(provider.refine(&[1, 2, 3], "", &[], None, None).await.is_err());
    }
}
