//! The ImageProvider client (C4): a synchronous HTTP call to the external
//! AI image generation service (spec.md §4.4). May take up to 120s; may
//! return transient errors the Worker retries (§7).

use async_trait::async_trait;
use logoforge_domain::PreserveAspect;

use crate::error::ImageProviderError;

/// A single ordered RGB palette, e.g. `["#1a2b3c", ...]` (5 colors). `None`
/// asks the provider for an unconstrained ("Original") rendering.
pub type PaletteColors = Option<Vec<String>>;

/// The ImageProvider client (C4).
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Generate a new image from a logo/theme description, optionally
    /// constrained to `palette_colors` so the provider honors a specific
    /// palette during generation (spec.md §4.4: "the same base concept is
    /// regenerated per palette to get stylistically consistent recolors").
    async fn generate(
        &self,
        logo_description: &str,
        theme_description: &str,
        palette_colors: PaletteColors,
    ) -> Result<Vec<u8>, ImageProviderError>;

    /// Refine an existing image per free-text `instructions`, preserving
    /// the aspects named in `preserve_aspects`.
    async fn refine(
        &self,
        base_bytes: &[u8],
        instructions: &str,
        preserve_aspects: &[PreserveAspect],
        updated_logo_description: Option<&str>,
        updated_theme_description: Option<&str>,
    ) -> Result<Vec<u8>, ImageProviderError>;

    /// Propose `n` named color palettes for a logo/theme description,
    /// colors only, no image yet (spec.md §4.7 workflow step 1: "a
    /// deterministic prompt-to-N-palettes step").
    async fn propose_palettes(
        &self,
        logo_description: &str,
        theme_description: &str,
        n: u8,
    ) -> Result<Vec<ProposedPalette>, ImageProviderError>;
}

/// One of the `n` palettes proposed ahead of the parallel per-palette
/// image generation stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedPalette {
    pub name: String,
    pub colors: Vec<String>,
}
