//! Wire-shaped input for the two enqueue flows (spec.md §4.6, §6).

use logoforge_domain::PreserveAspect;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub logo_description: String,
    pub theme_description: String,
    /// Bounded 1..=10 by the Dispatcher; `None` takes the deployment's
    /// configured default (spec.md §6 `NUM_PALETTES_DEFAULT`).
    pub num_palettes: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct RefineRequest {
    pub source_concept_id: Option<Uuid>,
    pub original_image_url: Option<String>,
    pub refinement_prompt: String,
    pub preserve_aspects: Vec<PreserveAspect>,
    pub updated_logo_description: Option<String>,
    pub updated_theme_description: Option<String>,
}
