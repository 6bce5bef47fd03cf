//! The Dispatcher (C6): shared procedure for both enqueue flows (spec.md
//! §4.6). Generic over the three gateways it composes so a process can
//! wire in any backend combination without this crate knowing about
//! Postgres, DynamoDB, or SQS.

use std::sync::Arc;

use logoforge_bus::{BusPublisher, TaskMessage};
use logoforge_domain::{clamp_error_message, validate_description, PartialFailure, Task, TaskMetadata};
use logoforge_rate_counter::RateCounter;
use logoforge_task_registry::{TaskRegistry, TaskRegistryError};
use logoforge_domain::RateCategory;
use uuid::Uuid;

use crate::error::DispatcherError;
use crate::request::{GenerateRequest, RefineRequest};

/// Bounds on `num_palettes` (spec.md §4.6: "default 7, bounded 1..10").
pub const MIN_NUM_PALETTES: u8 = 1;
pub const MAX_NUM_PALETTES: u8 = 10;

/// `check_and_decrement` always costs one request against the category
/// bucket — the Dispatcher never batches.
const RATE_COST: u32 = 1;

pub struct Dispatcher<C, R, B> {
    rate_counter: Arc<C>,
    task_registry: Arc<R>,
    bus: Arc<B>,
    num_palettes_default: u8,
}

impl<C, R, B> Dispatcher<C, R, B>
where
    C: RateCounter,
    R: TaskRegistry,
    B: BusPublisher,
{
    pub fn new(rate_counter: Arc<C>, task_registry: Arc<R>, bus: Arc<B>, num_palettes_default: u8) -> Self {
        Self { rate_counter, task_registry, bus, num_palettes_default }
    }

    /// spec.md §4.6 "Generate" procedure, steps 1–5.
    pub async fn enqueue_generate(&self, user_id: Uuid, request: GenerateRequest) -> Result<Task, DispatcherError> {
        validate_description("logo_description", &request.logo_description)?;
        validate_description("theme_description", &request.theme_description)?;
        let num_palettes = validate_num_palettes(request.num_palettes, self.num_palettes_default)?;

        self.check_rate_limit(user_id, RateCategory::GenerateConcept).await?;

        let metadata = TaskMetadata::Generate {
            logo_description: request.logo_description,
            theme_description: request.theme_description,
            num_palettes,
            partial_failures: Vec::<PartialFailure>::new(),
        };
        self.create_and_publish(user_id, metadata).await
    }

    /// spec.md §4.6 "Refine" procedure, same shape with `refine_concept`.
    pub async fn enqueue_refine(&self, user_id: Uuid, request: RefineRequest) -> Result<Task, DispatcherError> {
        validate_description("refinement_prompt", &request.refinement_prompt)?;

        self.check_rate_limit(user_id, RateCategory::RefineConcept).await?;

        let metadata = TaskMetadata::Refine {
            source_concept_id: request.source_concept_id,
            original_image_url: request.original_image_url,
            refinement_prompt: request.refinement_prompt,
            preserve_aspects: request.preserve_aspects,
            updated_logo_description: request.updated_logo_description,
            updated_theme_description: request.updated_theme_description,
            partial_failures: Vec::<PartialFailure>::new(),
        };
        self.create_and_publish(user_id, metadata).await
    }

    /// spec.md §4.1: "the system fails open for availability, logging a
    /// warning" — a `RateCounterError` allows the request through rather
    /// than blocking enqueue on the gateway's availability.
    async fn check_rate_limit(&self, user_id: Uuid, category: RateCategory) -> Result<(), DispatcherError> {
        match self.rate_counter.check_and_decrement(user_id, category, RATE_COST).await {
            Ok(outcome) if !outcome.allowed => Err(DispatcherError::RateLimited(outcome)),
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::warn!(%category, error = %err, "rate counter backend error; failing open");
                Ok(())
            }
        }
    }

    /// Steps 3–5: create the Task row, best-effort publish, return
    /// regardless of publish outcome (spec.md §7's documented rationale).
    /// The at-most-one-active rule (step 2, spec.md §3, §8 property 2) is
    /// enforced atomically inside `TaskRegistry::create` itself rather than
    /// as a separate `list_active` check beforehand — two concurrent calls
    /// for the same `(user_id, task_type)` can never both pass (spec.md
    /// S3's documented tie-break: the loser observes `ActiveTaskExists` and
    /// is rejected with `TaskConflict`).
    async fn create_and_publish(&self, user_id: Uuid, metadata: TaskMetadata) -> Result<Task, DispatcherError> {
        let task = match self.task_registry.create(user_id, metadata).await {
            Ok(task) => task,
            Err(TaskRegistryError::ActiveTaskExists) => return Err(DispatcherError::TaskConflict),
            Err(err) => return Err(err.into()),
        };

        let message = TaskMessage::new(task.task_id, task.user_id, task.metadata.clone());
        if let Err(err) = self.bus.publish(&message).await {
            tracing::warn!(
                task_id = %task.task_id,
                error = %err,
                "failed to publish task message; task remains pending for the reaper to reconcile"
            );
        }

        Ok(task)
    }
}

fn validate_num_palettes(requested: Option<u8>, default: u8) -> Result<u8, DispatcherError> {
    let value = requested.unwrap_or(default);
    if !(MIN_NUM_PALETTES..=MAX_NUM_PALETTES).contains(&value) {
        return Err(DispatcherError::Validation(clamp_error_message(format!(
            "num_palettes must be between {MIN_NUM_PALETTES} and {MAX_NUM_PALETTES}, got {value}"
        ))));
    }
    Ok(value)
}

impl From<logoforge_domain::DomainError> for DispatcherError {
    fn from(error: logoforge_domain::DomainError) -> Self {
        match error {
            logoforge_domain::DomainError::Validation(message) => DispatcherError::Validation(message),
            other => DispatcherError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logoforge_bus::InMemoryBus;
    use logoforge_domain::TaskType;
    use logoforge_rate_counter::InMemoryRateCounter;
    use logoforge_task_registry::InMemoryTaskRegistry;
    use std::collections::HashSet;

    fn dispatcher() -> Dispatcher<InMemoryRateCounter, InMemoryTaskRegistry, InMemoryBus> {
        Dispatcher::new(
            Arc::new(InMemoryRateCounter::new()),
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryBus::new()),
            7,
        )
    }

    fn generate_request() -> GenerateRequest {
        GenerateRequest {
            logo_description: "a stylized fox".into(),
            theme_description: "playful and modern".into(),
            num_palettes: None,
        }
    }

    #[tokio::test]
    async fn enqueue_generate_creates_a_pending_task_and_publishes_a_message() {
        let dispatcher = dispatcher();
        let user_id = Uuid::now_v7();

        let task = dispatcher.enqueue_generate(user_id, generate_request()).await.unwrap();

        assert_eq!(task.status, logoforge_domain::TaskStatus::Pending);
        assert_eq!(task.task_type, TaskType::Generate);
    }

    #[tokio::test]
    async fn second_enqueue_while_first_is_active_is_rejected_with_conflict() {
        let dispatcher = dispatcher();
        let user_id = Uuid::now_v7();

        dispatcher.enqueue_generate(user_id, generate_request()).await.unwrap();
        let second = dispatcher.enqueue_generate(user_id, generate_request()).await;

        assert!(matches!(second, Err(DispatcherError::TaskConflict)));
    }

    #[tokio::test]
    async fn empty_logo_description_is_rejected_before_any_rate_limit_check() {
        let dispatcher = dispatcher();
        let user_id = Uuid::now_v7();

        let mut request = generate_request();
        request.logo_description = "   ".into();

        let result = dispatcher.enqueue_generate(user_id, request).await;
        assert!(matches!(result, Err(DispatcherError::Validation(_))));
    }

    #[tokio::test]
    async fn num_palettes_out_of_bounds_is_rejected() {
        let dispatcher = dispatcher();
        let user_id = Uuid::now_v7();

        let mut request = generate_request();
        request.num_palettes = Some(0);
        assert!(matches!(dispatcher.enqueue_generate(user_id, request).await, Err(DispatcherError::Validation(_))));

        let mut request = generate_request();
        request.num_palettes = Some(11);
        assert!(matches!(dispatcher.enqueue_generate(user_id, request).await, Err(DispatcherError::Validation(_))));
    }

    #[tokio::test]
    async fn exhausted_rate_limit_is_surfaced_as_rate_limited() {
        let limits = logoforge_rate_counter::RateLimits::default().with_override(
            RateCategory::GenerateConcept,
            logoforge_rate_counter::CategoryLimit { limit: 0, window: std::time::Duration::from_secs(3600) },
        );
        let dispatcher = Dispatcher::new(
            Arc::new(InMemoryRateCounter::with_limits(limits)),
            Arc::new(InMemoryTaskRegistry::new()),
            Arc::new(InMemoryBus::new()),
            7,
        );
        let user_id = Uuid::now_v7();

        let result = dispatcher.enqueue_generate(user_id, generate_request()).await;
        assert!(matches!(result, Err(DispatcherError::RateLimited(_))));
    }

    #[tokio::test]
    async fn enqueue_refine_rejects_empty_refinement_prompt() {
        let dispatcher = dispatcher();
        let user_id = Uuid::now_v7();

        let request = RefineRequest {
            refinement_prompt: "".into(),
            ..Default::default()
        };
        assert!(matches!(dispatcher.enqueue_refine(user_id, request).await, Err(DispatcherError::Validation(_))));
    }

    /// spec.md §8 property 2 ("at-most-one-active"), scenario S3: N
    /// concurrent identical enqueue requests from the same user must yield
    /// exactly one pending task, not N. Exercised against a `Dispatcher`
    /// shared across tasks (same shape a multi-worker API process would
    /// see), not just the registry in isolation.
    #[tokio::test]
    async fn concurrent_enqueue_from_the_same_user_admits_exactly_one_task() {
        let dispatcher = Arc::new(dispatcher());
        let user_id = Uuid::now_v7();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let dispatcher = Arc::clone(&dispatcher);
            handles.push(tokio::spawn(async move { dispatcher.enqueue_generate(user_id, generate_request()).await }));
        }
        let results = futures::future::join_all(handles).await;

        let successes: Vec<Task> = results.into_iter().filter_map(|r| r.unwrap().ok()).collect();
        assert_eq!(successes.len(), 1, "exactly one of the concurrent enqueues should succeed");

        let active = dispatcher.task_registry.list_active(user_id, TaskType::Generate).await.unwrap();
        assert_eq!(active.len(), 1, "no more than one non-terminal task may exist for this user/type at once");

        let task_ids: HashSet<Uuid> = successes.iter().map(|t| t.task_id).collect();
        assert_eq!(task_ids.len(), 1);
    }
}
