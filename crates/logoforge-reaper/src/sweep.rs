//! The two Reaper sweeps (spec.md §4.10): processing-stall, pending-stall,
//! plus the Concept retention cleanup. Grounded on
//! `turul-mcp-task-storage`'s `run_background_cleanup` shape — a plain
//! async function the binary's interval loop calls on each tick, kept
//! separate from the loop itself so it is unit-testable without a timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use logoforge_blob_store::BlobStore;
use logoforge_domain::TaskStatus;
use logoforge_meta_store::ConceptStore;
use logoforge_task_registry::TaskRegistry;
use uuid::Uuid;

use crate::error::ReaperError;

/// `error_message` persisted on a processing-stall sweep (spec.md §4.10).
pub const PROCESSING_TIMEOUT_MESSAGE: &str = "timed out in processing";
/// `error_message` persisted on a pending-stall sweep (spec.md §4.10).
pub const PENDING_TIMEOUT_MESSAGE: &str = "not picked up";

/// What one `Reaper::sweep_once` call did, for logging and for tests that
/// assert on sweep outcomes without re-querying every registry/store.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub processing_timed_out: Vec<Uuid>,
    pub pending_timed_out: Vec<Uuid>,
    pub concepts_deleted: Vec<Uuid>,
    /// Blob paths the retention sweep failed to delete; deletion is
    /// best-effort (spec.md §3: "weak back-reference... the Reaper/
    /// CleanupJob reconciles"), so these are logged, not retried inline.
    pub blob_delete_failures: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.processing_timed_out.is_empty()
            && self.pending_timed_out.is_empty()
            && self.concepts_deleted.is_empty()
    }
}

pub struct Reaper<R, C, B> {
    task_registry: Arc<R>,
    concept_store: Arc<C>,
    blob_store: Arc<B>,
    processing_timeout: Duration,
    pending_timeout: Duration,
    /// `None` disables the retention sweep entirely (spec.md §9 Open
    /// Question: "production retention as configuration").
    concept_retention: Option<Duration>,
}

impl<R, C, B> Reaper<R, C, B>
where
    R: TaskRegistry,
    C: ConceptStore,
    B: BlobStore,
{
    pub fn new(
        task_registry: Arc<R>,
        concept_store: Arc<C>,
        blob_store: Arc<B>,
        processing_timeout: Duration,
        pending_timeout: Duration,
        concept_retention: Option<Duration>,
    ) -> Self {
        Self {
            task_registry,
            concept_store,
            blob_store,
            processing_timeout,
            pending_timeout,
            concept_retention,
        }
    }

    /// Runs both stall sweeps and (if configured) the retention sweep once.
    /// Called on every tick of the binary's interval loop.
    pub async fn sweep_once(&self) -> Result<SweepReport, ReaperError> {
        let now = Utc::now();
        let mut report = SweepReport::default();

        let processing_cutoff = now - chrono::Duration::from_std(self.processing_timeout).unwrap_or_default();
        report.processing_timed_out = self
            .task_registry
            .mark_failed_if_stale(TaskStatus::Processing, processing_cutoff, PROCESSING_TIMEOUT_MESSAGE)
            .await?;
        for task_id in &report.processing_timed_out {
            tracing::warn!(task_id = %task_id, "reaper: processing task timed out, marked failed");
        }

        let pending_cutoff = now - chrono::Duration::from_std(self.pending_timeout).unwrap_or_default();
        report.pending_timed_out = self
            .task_registry
            .mark_failed_if_stale(TaskStatus::Pending, pending_cutoff, PENDING_TIMEOUT_MESSAGE)
            .await?;
        for task_id in &report.pending_timed_out {
            tracing::warn!(task_id = %task_id, "reaper: pending task never picked up, marked failed");
        }

        if let Some(retention) = self.concept_retention {
            let retention_cutoff = now - chrono::Duration::from_std(retention).unwrap_or_default();
            let stale_concepts = self.concept_store.list_concepts_older_than(retention_cutoff).await?;
            for concept in stale_concepts {
                self.delete_concept_best_effort(&concept, &mut report).await?;
            }
        }

        Ok(report)
    }

    async fn delete_concept_best_effort(
        &self,
        concept: &logoforge_domain::Concept,
        report: &mut SweepReport,
    ) -> Result<(), ReaperError> {
        if let Err(err) = self.blob_store.delete(&concept.base_image_path).await {
            tracing::warn!(
                concept_id = %concept.concept_id, path = %concept.base_image_path, error = %err,
                "reaper: best-effort blob delete failed, leaving orphaned blob"
            );
            report.blob_delete_failures.push(concept.base_image_path.clone());
        }
        for variation in &concept.variations {
            if let Err(err) = self.blob_store.delete(&variation.image_path).await {
                tracing::warn!(
                    concept_id = %concept.concept_id, path = %variation.image_path, error = %err,
                    "reaper: best-effort blob delete failed, leaving orphaned blob"
                );
                report.blob_delete_failures.push(variation.image_path.clone());
            }
        }

        self.concept_store.delete_concept_cascade(concept.concept_id).await?;
        report.concepts_deleted.push(concept.concept_id);
        tracing::info!(concept_id = %concept.concept_id, "reaper: deleted expired concept");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_blob_store::InMemoryBlobStore;
    use logoforge_domain::{Concept, TaskMetadata, Variation};
    use logoforge_meta_store::InMemoryConceptStore;
    use logoforge_task_registry::{InMemoryTaskRegistry, TransitionPatch};

    fn reaper(
        processing_timeout: Duration,
        pending_timeout: Duration,
        retention: Option<Duration>,
    ) -> Reaper<InMemoryTaskRegistry, InMemoryConceptStore, InMemoryBlobStore> {
        Reaper::new(
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryConceptStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            processing_timeout,
            pending_timeout,
            retention,
        )
    }

    #[tokio::test]
    async fn processing_tasks_past_timeout_are_failed_with_the_timeout_message() {
        let reaper = reaper(Duration::from_millis(10), Duration::from_secs(3600), None);
        let task = reaper
            .task_registry
            .create(
                Uuid::now_v7(),
                TaskMetadata::Generate {
                    logo_description: "owl".into(),
                    theme_description: "modern".into(),
                    num_palettes: 3,
                    partial_failures: vec![],
                },
            )
            .await
            .unwrap();
        reaper
            .task_registry
            .transition(task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let report = reaper.sweep_once().await.unwrap();
        assert_eq!(report.processing_timed_out, vec![task.task_id]);

        let reloaded = reaper.task_registry.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Failed);
        assert_eq!(reloaded.error_message.as_deref(), Some(PROCESSING_TIMEOUT_MESSAGE));
    }

    #[tokio::test]
    async fn live_worker_task_updated_within_timeout_is_never_reaped() {
        let reaper = reaper(Duration::from_secs(1800), Duration::from_secs(1800), None);
        let task = reaper
            .task_registry
            .create(
                Uuid::now_v7(),
                TaskMetadata::Generate {
                    logo_description: "owl".into(),
                    theme_description: "modern".into(),
                    num_palettes: 3,
                    partial_failures: vec![],
                },
            )
            .await
            .unwrap();
        reaper
            .task_registry
            .transition(task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await
            .unwrap();

        let report = reaper.sweep_once().await.unwrap();
        assert!(report.processing_timed_out.is_empty());

        let reloaded = reaper.task_registry.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Processing);
    }

    #[tokio::test]
    async fn pending_tasks_never_picked_up_are_failed() {
        let reaper = reaper(Duration::from_secs(3600), Duration::from_millis(10), None);
        let task = reaper
            .task_registry
            .create(
                Uuid::now_v7(),
                TaskMetadata::Generate {
                    logo_description: "owl".into(),
                    theme_description: "modern".into(),
                    num_palettes: 3,
                    partial_failures: vec![],
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let report = reaper.sweep_once().await.unwrap();
        assert_eq!(report.pending_timed_out, vec![task.task_id]);

        let reloaded = reaper.task_registry.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, TaskStatus::Failed);
        assert_eq!(reloaded.error_message.as_deref(), Some(PENDING_TIMEOUT_MESSAGE));
    }

    #[tokio::test]
    async fn retention_sweep_deletes_expired_concepts_and_their_blobs() {
        let reaper = reaper(Duration::from_secs(3600), Duration::from_secs(3600), Some(Duration::from_millis(10)));
        let user_id = Uuid::now_v7();
        let concept_id = Uuid::now_v7();
        reaper.blob_store.put("concepts/base.png", vec![1, 2, 3], "image/png").await.unwrap();
        reaper.blob_store.put("concepts/variation.png", vec![4, 5, 6], "image/png").await.unwrap();
        let mut concept = Concept {
            concept_id,
            user_id,
            logo_description: "owl".into(),
            theme_description: "modern".into(),
            base_image_path: "concepts/base.png".into(),
            created_at: Utc::now(),
            variations: vec![],
        };
        concept.variations.push(Variation {
            variation_id: Uuid::now_v7(),
            concept_id,
            palette_name: "Original".into(),
            colors: vec!["#111111".into(); 5],
            image_path: "concepts/variation.png".into(),
            created_at: Utc::now(),
        });
        reaper.concept_store.insert_concept(concept).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        let report = reaper.sweep_once().await.unwrap();
        assert_eq!(report.concepts_deleted, vec![concept_id]);
        assert!(reaper.concept_store.get_concept(concept_id).await.unwrap().is_none());
        assert!(reaper.blob_store.get("concepts/base.png").await.is_err());
    }

    #[tokio::test]
    async fn retention_disabled_when_no_window_is_configured() {
        let reaper = reaper(Duration::from_secs(3600), Duration::from_secs(3600), None);
        let concept_id = Uuid::now_v7();
        let concept = Concept {
            concept_id,
            user_id: Uuid::now_v7(),
            logo_description: "owl".into(),
            theme_description: "modern".into(),
            base_image_path: "concepts/base.png".into(),
            created_at: Utc::now() - chrono::Duration::days(365),
            variations: vec![],
        };
        reaper.concept_store.insert_concept(concept).await.unwrap();

        let report = reaper.sweep_once().await.unwrap();
        assert!(report.concepts_deleted.is_empty());
        assert!(reaper.concept_store.get_concept(concept_id).await.unwrap().is_some());
    }
}
