//! Core data model shared by every LogoForge crate.
//!
//! Mirrors the shape of a protocol crate in this corpus: plain serde
//! structs, constructor helpers, no I/O. Gateways (`logoforge-meta-store`,
//! `logoforge-blob-store`, …) convert to/from their own row/item
//! representations; nothing here talks to a backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;
pub use error::DomainError;

/// Maximum length accepted for any free-text description field (§4.6).
pub const MAX_DESCRIPTION_LEN: usize = 500;
/// Maximum length of a persisted `error_message` (§7).
pub const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// `pending → processing → {completed | failed}` — see spec.md's state
/// machine diagram. `pending → failed` is allowed directly (reaper, cancel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Terminal statuses are immutable once reached.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Generate,
    Refine,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Generate => "generate",
            TaskType::Refine => "refine",
        };
        write!(f, "{s}")
    }
}

/// Canonical rate-limit category names (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateCategory {
    GenerateConcept,
    RefineConcept,
    StoreConcept,
    GetConcepts,
    ExportAction,
    AuthSessions,
}

impl fmt::Display for RateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RateCategory::GenerateConcept => "generate_concept",
            RateCategory::RefineConcept => "refine_concept",
            RateCategory::StoreConcept => "store_concept",
            RateCategory::GetConcepts => "get_concepts",
            RateCategory::ExportAction => "export_action",
            RateCategory::AuthSessions => "auth_sessions",
        };
        write!(f, "{s}")
    }
}

/// `preserve_aspects` enum for the refine workflow (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreserveAspect {
    Layout,
    Colors,
    Style,
    Symbols,
    Proportions,
}

/// One entry recorded under `metadata.partial_failures` (spec.md §4.7, S5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialFailure {
    pub palette_name: String,
    pub error_message: String,
}

/// Task-type-specific input, persisted in `Task::metadata` and echoed in
/// the bus payload (§6). The bus payload is duplicative; the Task row is
/// the source of truth — the Worker re-reads it after claiming.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskMetadata {
    Generate {
        logo_description: String,
        theme_description: String,
        num_palettes: u8,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        partial_failures: Vec<PartialFailure>,
    },
    Refine {
        source_concept_id: Option<Uuid>,
        original_image_url: Option<String>,
        refinement_prompt: String,
        preserve_aspects: Vec<PreserveAspect>,
        updated_logo_description: Option<String>,
        updated_theme_description: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        partial_failures: Vec<PartialFailure>,
    },
}

impl TaskMetadata {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskMetadata::Generate { .. } => TaskType::Generate,
            TaskMetadata::Refine { .. } => TaskType::Refine,
        }
    }

    pub fn push_partial_failure(&mut self, palette_name: impl Into<String>, message: impl Into<String>) {
        let failure = PartialFailure {
            palette_name: palette_name.into(),
            error_message: message.into(),
        };
        match self {
            TaskMetadata::Generate { partial_failures, .. } => partial_failures.push(failure),
            TaskMetadata::Refine { partial_failures, .. } => partial_failures.push(failure),
        }
    }
}

/// The central entity (§3). Identified by an opaque `task_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    /// Set iff `status == Completed`.
    pub result_id: Option<Uuid>,
    /// Set iff `status == Failed`; ≤ `MAX_ERROR_MESSAGE_LEN` chars.
    pub error_message: Option<String>,
    pub metadata: TaskMetadata,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(user_id: Uuid, metadata: TaskMetadata) -> Self {
        let now = Utc::now();
        Self {
            task_id: Uuid::now_v7(),
            user_id,
            task_type: metadata.task_type(),
            status: TaskStatus::Pending,
            result_id: None,
            error_message: None,
            metadata,
            is_cancelled: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single recolored rendering of a `Concept` under one palette (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variation {
    pub variation_id: Uuid,
    pub concept_id: Uuid,
    pub palette_name: String,
    /// Ordered list of 5 RGB hex color strings, e.g. `"#1a2b3c"`.
    pub colors: Vec<String>,
    pub image_path: String,
    pub created_at: DateTime<Utc>,
}

/// Produced on success (§3). Owned by its creator; immutable after creation
/// except for cascade delete (concept → variations) performed by the Reaper
/// or an explicit delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub concept_id: Uuid,
    pub user_id: Uuid,
    pub logo_description: String,
    pub theme_description: String,
    pub base_image_path: String,
    pub created_at: DateTime<Utc>,
    pub variations: Vec<Variation>,
}

/// A token bucket, lazily created on first access, reset on a wall-clock
/// window boundary (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateState {
    pub limit: u32,
    pub remaining: u32,
    pub reset_after_seconds: u64,
}

impl RateState {
    pub fn allowed(&self) -> bool {
        self.remaining > 0
    }
}

/// Validate a free-text description per §4.6: non-empty, ≤ 500 chars.
pub fn validate_description(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(DomainError::Validation(format!(
            "{field} exceeds {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// Truncate an error message to the persisted limit, matching §7's
/// "every failed task carries a human-readable error_message ≤ 200 chars".
pub fn clamp_error_message(message: impl Into<String>) -> String {
    let message = message.into();
    if message.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        message
    } else {
        message.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_task_starts_pending_and_uncancelled() {
        let task = Task::new(
            Uuid::new_v4(),
            TaskMetadata::Generate {
                logo_description: "A fox".into(),
                theme_description: "forest".into(),
                num_palettes: 3,
                partial_failures: vec![],
            },
        );
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(!task.is_cancelled);
        assert_eq!(task.task_type, TaskType::Generate);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn description_validation_rejects_empty_and_overlong() {
        assert!(validate_description("logo_description", "").is_err());
        assert!(validate_description("logo_description", "   ").is_err());
        let long = "a".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(validate_description("logo_description", &long).is_err());
        assert!(validate_description("logo_description", "A minimalist fox").is_ok());
    }

    #[test]
    fn clamp_error_message_truncates() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LEN + 50);
        let clamped = clamp_error_message(long);
        assert_eq!(clamped.chars().count(), MAX_ERROR_MESSAGE_LEN);
    }

    #[test]
    fn rate_state_allowed() {
        let rs = RateState { limit: 10, remaining: 0, reset_after_seconds: 3600 };
        assert!(!rs.allowed());
        let rs = RateState { limit: 10, remaining: 1, reset_after_seconds: 3600 };
        assert!(rs.allowed());
    }
}
