//! Shared parity test bodies run against every Task Registry backend. Each
//! function takes an `Arc<dyn TaskRegistry>` so the same assertions hold
//! for in-memory and postgres (spec.md §10.5: "a parity_tests
//! module/macro pattern... so each backend is held to the same contract").

use std::sync::Arc;

use logoforge_domain::{TaskMetadata, TaskStatus, TaskType};
use uuid::Uuid;

use crate::error::TaskRegistryError;
use crate::traits::{TaskRegistry, TransitionPatch};

fn generate_metadata() -> TaskMetadata {
    TaskMetadata::Generate {
        logo_description: "A minimalist fox".into(),
        theme_description: "forest green and cream".into(),
        num_palettes: 3,
        partial_failures: vec![],
    }
}

pub async fn create_then_get_round_trips(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.task_type, TaskType::Generate);

    let fetched = registry.get(task.task_id).await.unwrap().unwrap();
    assert_eq!(fetched.task_id, task.task_id);
    assert_eq!(fetched.user_id, user_id);
}

pub async fn get_missing_task_returns_none(registry: Arc<dyn TaskRegistry>) {
    assert!(registry.get(Uuid::new_v4()).await.unwrap().is_none());
}

pub async fn full_lifecycle_generate_to_completed(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();

    let processing = registry
        .transition(task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
        .await
        .unwrap();
    assert_eq!(processing.status, TaskStatus::Processing);

    let result_id = Uuid::new_v4();
    let completed = registry
        .transition(
            task.task_id,
            TaskStatus::Processing,
            TaskStatus::Completed,
            TransitionPatch::completed(result_id),
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.result_id, Some(result_id));
    assert!(completed.error_message.is_none());
}

pub async fn failed_transition_records_error_message(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    registry
        .transition(task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
        .await
        .unwrap();

    let failed = registry
        .transition(
            task.task_id,
            TaskStatus::Processing,
            TaskStatus::Failed,
            TransitionPatch::failed("provider rejected the prompt"),
        )
        .await
        .unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("provider rejected the prompt"));
    assert!(failed.result_id.is_none());
}

pub async fn transition_conflict_on_wrong_expected_status(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    let result = registry
        .transition(task.task_id, TaskStatus::Processing, TaskStatus::Completed, TransitionPatch::default())
        .await;
    assert!(matches!(
        result,
        Err(TaskRegistryError::TransitionConflict { expected: TaskStatus::Processing, actual: TaskStatus::Pending, .. })
    ));
}

pub async fn terminal_task_is_immutable(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    registry
        .transition(task.task_id, TaskStatus::Pending, TaskStatus::Failed, TransitionPatch::failed("not picked up"))
        .await
        .unwrap();

    let result = registry
        .transition(task.task_id, TaskStatus::Failed, TaskStatus::Processing, TransitionPatch::default())
        .await;
    assert!(result.is_err());
}

pub async fn list_active_reflects_one_active_rule(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    assert_eq!(registry.list_active(user_id, TaskType::Generate).await.unwrap().len(), 0);

    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    assert_eq!(registry.list_active(user_id, TaskType::Generate).await.unwrap().len(), 1);
    assert_eq!(registry.list_active(user_id, TaskType::Refine).await.unwrap().len(), 0);

    registry
        .transition(task.task_id, TaskStatus::Pending, TaskStatus::Failed, TransitionPatch::failed("cancelled"))
        .await
        .unwrap();
    assert_eq!(registry.list_active(user_id, TaskType::Generate).await.unwrap().len(), 0);
}

pub async fn list_for_user_filters_and_orders_newest_first(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let other_user = Uuid::new_v4();
    registry.create(other_user, generate_metadata()).await.unwrap();
    let first = registry.create(user_id, generate_metadata()).await.unwrap();
    // The at-most-one-active rule forbids a second non-terminal task for
    // the same (user, type); terminate `first` before creating `second`.
    registry
        .transition(first.task_id, TaskStatus::Pending, TaskStatus::Failed, TransitionPatch::failed("superseded"))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = registry.create(user_id, generate_metadata()).await.unwrap();

    let listed = registry.list_for_user(user_id, None, None, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].task_id, second.task_id);
    assert_eq!(listed[1].task_id, first.task_id);
}

pub async fn set_cancelled_is_idempotent(registry: Arc<dyn TaskRegistry>) {
    let user_id = Uuid::new_v4();
    let task = registry.create(user_id, generate_metadata()).await.unwrap();
    let first = registry.set_cancelled(task.task_id).await.unwrap();
    let second = registry.set_cancelled(task.task_id).await.unwrap();
    assert!(first.is_cancelled && second.is_cancelled);
}

pub async fn mark_failed_if_stale_only_reaps_matching_status_and_age(registry: Arc<dyn TaskRegistry>) {
    // Distinct users: the at-most-one-active rule forbids two concurrently
    // non-terminal tasks for the same (user, type).
    let pending_task = registry.create(Uuid::new_v4(), generate_metadata()).await.unwrap();
    let processing_task = registry.create(Uuid::new_v4(), generate_metadata()).await.unwrap();
    registry
        .transition(processing_task.task_id, TaskStatus::Pending, TaskStatus::Processing, TransitionPatch::default())
        .await
        .unwrap();

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    let reaped = registry
        .mark_failed_if_stale(TaskStatus::Pending, cutoff, "not picked up")
        .await
        .unwrap();
    assert_eq!(reaped, vec![pending_task.task_id]);

    let still_processing = registry.get(processing_task.task_id).await.unwrap().unwrap();
    assert_eq!(still_processing.status, TaskStatus::Processing);
}

/// Run the full parity suite against a freshly constructed backend.
pub async fn run_all(registry: Arc<dyn TaskRegistry>) {
    create_then_get_round_trips(Arc::clone(&registry)).await;
    get_missing_task_returns_none(Arc::clone(&registry)).await;
    full_lifecycle_generate_to_completed(Arc::clone(&registry)).await;
    failed_transition_records_error_message(Arc::clone(&registry)).await;
    transition_conflict_on_wrong_expected_status(Arc::clone(&registry)).await;
    terminal_task_is_immutable(Arc::clone(&registry)).await;
    list_active_reflects_one_active_rule(Arc::clone(&registry)).await;
    list_for_user_filters_and_orders_newest_first(Arc::clone(&registry)).await;
    set_cancelled_is_idempotent(Arc::clone(&registry)).await;
    mark_failed_if_stale_only_reaps_matching_status_and_age(registry).await;
}

#[cfg(test)]
mod in_memory_parity {
    use super::*;
    use crate::in_memory::InMemoryTaskRegistry;

    #[tokio::test]
    async fn runs_full_parity_suite() {
        run_all(Arc::new(InMemoryTaskRegistry::new())).await;
    }
}
