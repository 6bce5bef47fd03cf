use async_trait::async_trait;
use chrono::{DateTime, Utc};
use logoforge_domain::Concept;
use uuid::Uuid;

use crate::error::MetaStoreError;

/// CRUD over Concept/Variation records (spec.md §4.2). Task row mutation is
/// out of scope here: that is `logoforge-task-registry`'s sole
/// responsibility.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Inserts a Concept and all of its Variations as one logical unit
    /// (spec.md §4.6 step 3: "insert concept; insert variations" must not
    /// leave a dangling Concept row with no Variations visible to a reader).
    async fn insert_concept(&self, concept: Concept) -> Result<Concept, MetaStoreError>;

    async fn get_concept(&self, concept_id: Uuid) -> Result<Option<Concept>, MetaStoreError>;

    /// Newest-first, for the `/concepts/list` endpoint.
    async fn list_concepts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Concept>, MetaStoreError>;

    /// Cascade delete: removes the Concept row and all of its Variations.
    /// Does not touch the underlying blobs (spec.md §3: "weak
    /// back-reference... the Reaper/CleanupJob reconciles").
    async fn delete_concept_cascade(&self, concept_id: Uuid) -> Result<(), MetaStoreError>;

    /// Concepts created before `cutoff`, for the Reaper's retention sweep
    /// (spec.md §4.10).
    async fn list_concepts_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Concept>, MetaStoreError>;
}
