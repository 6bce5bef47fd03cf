//! The Worker (C7) state machine (spec.md §4.7):
//!
//! ```text
//! on_message(msg):
//!   task = TaskRegistry.transition(msg.task_id, pending -> processing, {})
//!   if transition failed:
//!      if task.status in {completed, failed}: ack, return   // duplicate
//!      else: nack for retry                                  // still processing elsewhere
//!   try:
//!      result = run_workflow(task)
//!      TaskRegistry.transition(task.id, processing -> completed, {result_id})
//!   catch transient e:
//!      raise (nack)
//!   catch permanent e:
//!      TaskRegistry.transition(task.id, processing -> failed, {error_message})
//! ```

use std::sync::Arc;

use logoforge_blob_store::BlobStore;
use logoforge_bus::{BusConsumer, DeliveredMessage};
use logoforge_domain::{clamp_error_message, Task, TaskMetadata, TaskStatus};
use logoforge_image_provider::ImageProvider;
use logoforge_meta_store::ConceptStore;
use logoforge_runtime::CancellationRegistry;
use logoforge_task_registry::{TaskRegistry, TaskRegistryError, TransitionPatch};

use crate::error::{WorkerError, WorkflowError};
use crate::workflow;

/// spec.md §7: "retried within the Worker via message redelivery (up to 5
/// attempts by default); after exhaustion → permanent fail."
pub const MAX_DELIVERY_ATTEMPTS: u32 = 5;

/// What the caller should do with the delivered bus message after
/// `WorkerLoop::on_message` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Ack,
    Nack,
}

/// The Worker (C7), generic over every gateway it composes so a process can
/// wire in any backend combination.
pub struct WorkerLoop<R, C, B, P, Q> {
    task_registry: Arc<R>,
    concept_store: Arc<C>,
    blob_store: Arc<B>,
    image_provider: Arc<P>,
    bus: Arc<Q>,
    cancellation_registry: CancellationRegistry,
    worker_parallelism: usize,
}

impl<R, C, B, P, Q> WorkerLoop<R, C, B, P, Q>
where
    R: TaskRegistry + 'static,
    C: ConceptStore + 'static,
    B: BlobStore + 'static,
    P: ImageProvider + 'static,
    Q: BusConsumer + 'static,
{
    pub fn new(
        task_registry: Arc<R>,
        concept_store: Arc<C>,
        blob_store: Arc<B>,
        image_provider: Arc<P>,
        bus: Arc<Q>,
        worker_parallelism: usize,
    ) -> Self {
        Self {
            task_registry,
            concept_store,
            blob_store,
            image_provider,
            bus,
            cancellation_registry: CancellationRegistry::new(),
            worker_parallelism,
        }
    }

    pub fn cancellation_registry(&self) -> &CancellationRegistry {
        &self.cancellation_registry
    }

    /// Long-poll the bus and process one message at a time. Returns when
    /// `receive` yields no message and the caller should back off, or
    /// propagates a bus error. Intended to be called in a loop by `main`.
    pub async fn poll_once(&self) -> Result<Option<MessageOutcome>, WorkerError> {
        let delivered = match self.bus.receive().await? {
            Some(delivered) => delivered,
            None => return Ok(None),
        };
        let outcome = self.on_message(&delivered).await;
        match outcome {
            MessageOutcome::Ack => self.bus.ack(&delivered.handle).await?,
            MessageOutcome::Nack => self.bus.nack(&delivered.handle).await?,
        }
        Ok(Some(outcome))
    }

    /// spec.md §4.7's `on_message` procedure. Never returns an `Err` —
    /// every failure mode resolves to an ack/nack decision, matching "the
    /// loser observes the failure and acks the message without
    /// reprocessing" (spec.md §4.5 tie-break rule).
    pub async fn on_message(&self, delivered: &DeliveredMessage) -> MessageOutcome {
        let task_id = delivered.message.task_id;

        let claim = self
            .task_registry
            .transition(task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
            .await;

        let task = match claim {
            Ok(task) => task,
            Err(TaskRegistryError::TransitionConflict { actual, .. }) => {
                if actual.is_terminal() {
                    tracing::debug!(%task_id, status = %actual, "duplicate delivery of an already-terminal task; acking");
                    return MessageOutcome::Ack;
                }
                tracing::debug!(%task_id, status = %actual, "task already claimed by another worker; nacking for retry");
                return MessageOutcome::Nack;
            }
            Err(TaskRegistryError::NotFound(_)) => {
                tracing::warn!(%task_id, "task row not found when claiming; acking stale message");
                return MessageOutcome::Ack;
            }
            Err(err) => {
                tracing::error!(%task_id, error = %err, "task registry error while claiming task; nacking for retry");
                return MessageOutcome::Nack;
            }
        };

        let cancellation = self.cancellation_registry.register(task_id).await;
        let result = self.run_workflow(&task, delivered.delivery_count, &cancellation).await;
        self.cancellation_registry.forget(task_id).await;

        match result {
            Ok(WorkflowOutcome::Completed { result_id, metadata }) => {
                let patch = match metadata {
                    Some(metadata) => TransitionPatch::completed_with_metadata(result_id, metadata),
                    None => TransitionPatch::completed(result_id),
                };
                match self.task_registry.transition(task_id, TaskStatus::Processing, TaskStatus::Completed, patch).await {
                    Ok(_) => MessageOutcome::Ack,
                    Err(err) => {
                        tracing::error!(%task_id, error = %err, "failed to record completed task; nacking for retry");
                        MessageOutcome::Nack
                    }
                }
            }
            Err(WorkflowError::Transient(reason)) => {
                tracing::warn!(%task_id, reason = %reason, attempt = delivered.delivery_count, "transient workflow error");
                if delivered.delivery_count >= MAX_DELIVERY_ATTEMPTS {
                    self.fail_task(task_id, format!("exhausted retries: {reason}")).await;
                    MessageOutcome::Ack
                } else {
                    MessageOutcome::Nack
                }
            }
            Err(WorkflowError::Permanent(reason)) => {
                self.fail_task(task_id, reason).await;
                MessageOutcome::Ack
            }
            Err(WorkflowError::AllPalettesFailed { count }) => {
                self.fail_task(task_id, format!("all {count} palette generations failed")).await;
                MessageOutcome::Ack
            }
            Err(WorkflowError::Cancelled) => {
                self.fail_task(task_id, "cancelled").await;
                MessageOutcome::Ack
            }
        }
    }

    async fn fail_task(&self, task_id: uuid::Uuid, reason: impl Into<String>) {
        let patch = TransitionPatch::failed(reason);
        if let Err(err) = self.task_registry.transition(task_id, TaskStatus::Processing, TaskStatus::Failed, patch).await {
            tracing::error!(%task_id, error = %err, "failed to record failed task");
        }
    }

    /// Re-reads the Task row (spec.md §6: "the row is the source of truth
    /// on read") and dispatches to the generate/refine workflow.
    async fn run_workflow(
        &self,
        task: &Task,
        delivery_count: u32,
        cancellation: &logoforge_runtime::CancellationHandle,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let current = self
            .task_registry
            .get(task.task_id)
            .await
            .map_err(|e| WorkflowError::Transient(e.to_string()))?
            .ok_or_else(|| WorkflowError::Permanent("task disappeared after claim".into()))?;

        if current.is_cancelled {
            return Err(WorkflowError::Cancelled);
        }

        match &current.metadata {
            TaskMetadata::Generate { logo_description, theme_description, num_palettes, .. } => {
                let (concept_id, partial_failures) = workflow::run_generate(
                    current.task_id,
                    current.user_id,
                    logo_description,
                    theme_description,
                    *num_palettes,
                    &self.image_provider,
                    &self.blob_store,
                    &self.concept_store,
                    self.worker_parallelism,
                    cancellation,
                )
                .await?;

                let metadata = if partial_failures.is_empty() {
                    None
                } else {
                    let mut metadata = current.metadata.clone();
                    for failure in &partial_failures {
                        metadata.push_partial_failure(failure.palette_name.clone(), clamp_error_message(failure.error_message.clone()));
                    }
                    Some(metadata)
                };

                tracing::info!(
                    task_id = %current.task_id, %concept_id, delivery_count,
                    partial_failures = partial_failures.len(),
                    "generate workflow completed"
                );
                Ok(WorkflowOutcome::Completed { result_id: concept_id, metadata })
            }
            TaskMetadata::Refine { .. } => {
                let (prompt, preserve_aspects, updated_logo, updated_theme) =
                    workflow::expect_refine(&current.metadata).expect("matched Refine variant above");

                let source_bytes = self.load_refine_source(&current).await?;

                if cancellation.is_cancelled() {
                    return Err(WorkflowError::Cancelled);
                }

                let concept_id = workflow::run_refine(
                    current.user_id,
                    source_bytes,
                    prompt,
                    preserve_aspects,
                    updated_logo,
                    updated_theme,
                    &self.image_provider,
                    &self.blob_store,
                    &self.concept_store,
                )
                .await?;

                tracing::info!(task_id = %current.task_id, %concept_id, delivery_count, "refine workflow completed");
                Ok(WorkflowOutcome::Completed { result_id: concept_id, metadata: None })
            }
        }
    }

    /// spec.md §4.7 refine step 1: "Load source image bytes from C3 (or
    /// fetch the original URL)". `original_image_url` is resolved as a
    /// BlobStore path rather than an arbitrary network fetch — the API
    /// layer always hands the Worker a path it previously signed, never a
    /// third-party URL (spec.md §4.3's signed-URL/raw-path duality).
    async fn load_refine_source(&self, task: &Task) -> Result<Vec<u8>, WorkflowError> {
        let (source_concept_id, original_image_url) = match &task.metadata {
            TaskMetadata::Refine { source_concept_id, original_image_url, .. } => (*source_concept_id, original_image_url.clone()),
            _ => unreachable!("caller already matched Refine"),
        };

        if let Some(concept_id) = source_concept_id {
            let concept = self
                .concept_store
                .get_concept(concept_id)
                .await
                .map_err(|e| WorkflowError::Transient(e.to_string()))?
                .ok_or_else(|| WorkflowError::Permanent(format!("source concept {concept_id} not found")))?;
            return Ok(self.blob_store.get(&concept.base_image_path).await?);
        }

        if let Some(path) = original_image_url {
            return Ok(self.blob_store.get(&path).await?);
        }

        Err(WorkflowError::Permanent("refine task has neither source_concept_id nor original_image_url".into()))
    }
}

enum WorkflowOutcome {
    Completed { result_id: uuid::Uuid, metadata: Option<TaskMetadata> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_blob_store::InMemoryBlobStore;
    use logoforge_bus::{InMemoryBus, TaskMessage};
    use logoforge_domain::{PartialFailure, TaskType};
    use logoforge_image_provider::FakeImageProvider;
    use logoforge_meta_store::InMemoryConceptStore;
    use logoforge_task_registry::InMemoryTaskRegistry;
    use uuid::Uuid;

    fn worker() -> WorkerLoop<InMemoryTaskRegistry, InMemoryConceptStore, InMemoryBlobStore, FakeImageProvider, InMemoryBus> {
        WorkerLoop::new(
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryConceptStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            Arc::new(FakeImageProvider::new()),
            Arc::new(InMemoryBus::new()),
            3,
        )
    }

    async fn seed_generate_task(
        worker: &WorkerLoop<InMemoryTaskRegistry, InMemoryConceptStore, InMemoryBlobStore, FakeImageProvider, InMemoryBus>,
        num_palettes: u8,
    ) -> Uuid {
        let task = worker
            .task_registry
            .create(
                Uuid::now_v7(),
                TaskMetadata::Generate {
                    logo_description: "a fox".into(),
                    theme_description: "forest".into(),
                    num_palettes,
                    partial_failures: Vec::<PartialFailure>::new(),
                },
            )
            .await
            .unwrap();
        worker
            .bus
            .publish(&TaskMessage::new(task.task_id, task.user_id, task.metadata.clone()))
            .await
            .unwrap();
        task.task_id
    }

    #[tokio::test]
    async fn happy_generate_completes_the_task_with_n_variations() {
        let worker = worker();
        let task_id = seed_generate_task(&worker, 3).await;

        let outcome = worker.poll_once().await.unwrap();
        assert_eq!(outcome, Some(MessageOutcome::Ack));

        let task = worker.task_registry.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let concept = worker.concept_store.get_concept(task.result_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(concept.variations.len(), 3);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_acked_without_reprocessing() {
        let worker = worker();
        let task_id = seed_generate_task(&worker, 2).await;

        worker.poll_once().await.unwrap();
        let task_after_first = worker.task_registry.get(task_id).await.unwrap().unwrap();
        assert_eq!(task_after_first.status, TaskStatus::Completed);

        // Simulate a duplicate delivery for the same (now-terminal) task.
        worker
            .bus
            .publish(&TaskMessage::new(task_id, task_after_first.user_id, task_after_first.metadata.clone()))
            .await
            .unwrap();
        let outcome = worker.poll_once().await.unwrap();
        assert_eq!(outcome, Some(MessageOutcome::Ack));

        let task_after_duplicate = worker.task_registry.get(task_id).await.unwrap().unwrap();
        assert_eq!(task_after_duplicate.updated_at, task_after_first.updated_at);
    }

    #[tokio::test]
    async fn partial_palette_failure_still_completes_with_recorded_failures() {
        let provider = Arc::new(FakeImageProvider::new());
        provider.fail_on_call(1);
        let worker = WorkerLoop::new(
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryConceptStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            provider,
            Arc::new(InMemoryBus::new()),
            3,
        );
        let task_id = seed_generate_task(&worker, 3).await;

        worker.poll_once().await.unwrap();

        let task = worker.task_registry.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        let concept = worker.concept_store.get_concept(task.result_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(concept.variations.len(), 2);
        match &task.metadata {
            TaskMetadata::Generate { partial_failures, .. } => assert_eq!(partial_failures.len(), 1),
            _ => panic!("expected generate metadata"),
        }
    }

    #[tokio::test]
    async fn refine_loads_source_from_concept_and_completes() {
        let worker = worker();
        let seed_user = Uuid::now_v7();
        let seed = worker
            .concept_store
            .insert_concept(logoforge_domain::Concept {
                concept_id: Uuid::now_v7(),
                user_id: seed_user,
                logo_description: "owl".into(),
                theme_description: "minimal".into(),
                base_image_path: "concepts/seed/base.png".into(),
                created_at: chrono::Utc::now(),
                variations: vec![],
            })
            .await
            .unwrap();
        worker.blob_store.put(&seed.base_image_path, vec![1, 2, 3, 4], "image/png").await.unwrap();

        let task = worker
            .task_registry
            .create(
                seed_user,
                TaskMetadata::Refine {
                    source_concept_id: Some(seed.concept_id),
                    original_image_url: None,
                    refinement_prompt: "make it bolder".into(),
                    preserve_aspects: vec![],
                    updated_logo_description: None,
                    updated_theme_description: None,
                    partial_failures: Vec::new(),
                },
            )
            .await
            .unwrap();
        worker.bus.publish(&TaskMessage::new(task.task_id, task.user_id, task.metadata.clone())).await.unwrap();

        let outcome = worker.poll_once().await.unwrap();
        assert_eq!(outcome, Some(MessageOutcome::Ack));
        let task = worker.task_registry.get(task.task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn all_palettes_failing_fails_the_task() {
        let provider = Arc::new(FakeImageProvider::new());
        provider.fail_on_call(0);
        let worker = WorkerLoop::new(
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryConceptStore::new()),
            Arc::new(InMemoryBlobStore::new()),
            provider,
            Arc::new(InMemoryBus::new()),
            3,
        );
        let task_id = seed_generate_task(&worker, 1).await;

        worker.poll_once().await.unwrap();

        let task = worker.task_registry.get(task_id).await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.error_message.is_some());
    }

    #[tokio::test]
    async fn empty_queue_poll_returns_none() {
        let worker = worker();
        assert_eq!(worker.poll_once().await.unwrap(), None);
    }

    #[test]
    fn task_type_matches_for_generate_and_refine() {
        assert_eq!(TaskType::Generate.to_string(), "generate");
        assert_eq!(TaskType::Refine.to_string(), "refine");
    }
}
