//! Wire-shaped JSON request/response bodies (spec.md §6). Kept separate
//! from `logoforge_domain`'s types so the domain model never carries
//! `serde` rename/default annotations driven purely by HTTP wire concerns.

use chrono::{DateTime, Utc};
use logoforge_domain::{Concept, PreserveAspect, Task, TaskMetadata, TaskStatus, TaskType, Variation};
use logoforge_rate_counter::CheckOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequestBody {
    pub logo_description: String,
    pub theme_description: String,
    #[serde(default)]
    pub num_palettes: Option<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefineRequestBody {
    #[serde(default)]
    pub original_image_url: Option<String>,
    #[serde(default)]
    pub concept_id: Option<Uuid>,
    pub refinement_prompt: String,
    #[serde(default)]
    pub preserve_aspects: Vec<PreserveAspect>,
    #[serde(default)]
    pub updated_logo_description: Option<String>,
    #[serde(default)]
    pub updated_theme_description: Option<String>,
}

impl From<GenerateRequestBody> for logoforge_dispatcher::GenerateRequest {
    fn from(body: GenerateRequestBody) -> Self {
        Self {
            logo_description: body.logo_description,
            theme_description: body.theme_description,
            num_palettes: body.num_palettes,
        }
    }
}

impl From<RefineRequestBody> for logoforge_dispatcher::RefineRequest {
    fn from(body: RefineRequestBody) -> Self {
        Self {
            source_concept_id: body.concept_id,
            original_image_url: body.original_image_url,
            refinement_prompt: body.refinement_prompt,
            preserve_aspects: body.preserve_aspects,
            updated_logo_description: body.updated_logo_description,
            updated_theme_description: body.updated_theme_description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequestBody {
    /// A `BlobStore` path, e.g. a Concept's `base_image_path` or a
    /// Variation's `image_path` (spec.md §6 `image_identifier`).
    pub image_identifier: String,
    pub target_format: String,
    #[serde(default)]
    pub target_size: Option<u32>,
}

/// `spec.md §6`: `task_id, status, type, result_id?, error_message?,
/// created_at, updated_at, is_cancelled`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_cancelled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partial_failures: Vec<logoforge_domain::PartialFailure>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        let partial_failures = match &task.metadata {
            TaskMetadata::Generate { partial_failures, .. } => partial_failures.clone(),
            TaskMetadata::Refine { partial_failures, .. } => partial_failures.clone(),
        };
        Self {
            task_id: task.task_id,
            status: task.status,
            task_type: task.task_type,
            result_id: task.result_id,
            error_message: task.error_message,
            created_at: task.created_at,
            updated_at: task.updated_at,
            is_cancelled: task.is_cancelled,
            partial_failures,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VariationDto {
    pub variation_id: Uuid,
    pub palette_name: String,
    pub colors: Vec<String>,
    pub image_url: String,
}

impl VariationDto {
    pub fn new(variation: &Variation, image_url: String) -> Self {
        Self {
            variation_id: variation.variation_id,
            palette_name: variation.palette_name.clone(),
            colors: variation.colors.clone(),
            image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptSummary {
    pub concept_id: Uuid,
    pub logo_description: String,
    pub theme_description: String,
    pub created_at: DateTime<Utc>,
    pub variation_count: usize,
}

impl From<&Concept> for ConceptSummary {
    fn from(concept: &Concept) -> Self {
        Self {
            concept_id: concept.concept_id,
            logo_description: concept.logo_description.clone(),
            theme_description: concept.theme_description.clone(),
            created_at: concept.created_at,
            variation_count: concept.variations.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptDetail {
    pub concept_id: Uuid,
    pub logo_description: String,
    pub theme_description: String,
    pub created_at: DateTime<Utc>,
    pub base_image_url: String,
    pub variations: Vec<VariationDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateLimitEntry {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_seconds: u64,
}

impl From<CheckOutcome> for RateLimitEntry {
    fn from(outcome: CheckOutcome) -> Self {
        Self {
            limit: outcome.limit,
            remaining: outcome.remaining,
            reset_after_seconds: outcome.reset_after_seconds,
        }
    }
}

/// Keyed by the canonical category name (e.g. `"generate_concept"`), not
/// the `RateCategory` enum directly — `serde_json`'s map serializer
/// requires string keys, and an enum unit variant's derived `Serialize`
/// impl does not satisfy that even though its `Display` impl produces the
/// same string.
pub type RateLimitSnapshot = HashMap<String, RateLimitEntry>;

#[derive(Debug, Clone, Default)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub task_type: Option<TaskType>,
    pub limit: Option<u32>,
}

/// Default page size for `GET /tasks` and `/concepts/list` (spec.md §6:
/// "`N` default 10, max 100" for concepts; tasks has no stated cap, so the
/// same 100-item ceiling is applied for consistency).
pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 100;
