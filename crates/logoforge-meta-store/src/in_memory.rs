use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use logoforge_domain::Concept;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::change_feed::{TaskChangeEvent, TaskChangeFeed};
use crate::error::MetaStoreError;
use crate::traits::ConceptStore;

#[derive(Default)]
pub struct InMemoryConceptStore {
    concepts: RwLock<HashMap<Uuid, Concept>>,
}

impl InMemoryConceptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConceptStore for InMemoryConceptStore {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn insert_concept(&self, concept: Concept) -> Result<Concept, MetaStoreError> {
        let mut concepts = self.concepts.write().await;
        concepts.insert(concept.concept_id, concept.clone());
        Ok(concept)
    }

    async fn get_concept(&self, concept_id: Uuid) -> Result<Option<Concept>, MetaStoreError> {
        Ok(self.concepts.read().await.get(&concept_id).cloned())
    }

    async fn list_concepts_for_user(&self, user_id: Uuid, limit: u32) -> Result<Vec<Concept>, MetaStoreError> {
        let concepts = self.concepts.read().await;
        let mut matching: Vec<Concept> = concepts.values().filter(|c| c.user_id == user_id).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit as usize);
        Ok(matching)
    }

    async fn delete_concept_cascade(&self, concept_id: Uuid) -> Result<(), MetaStoreError> {
        self.concepts.write().await.remove(&concept_id);
        Ok(())
    }

    async fn list_concepts_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Concept>, MetaStoreError> {
        let concepts = self.concepts.read().await;
        Ok(concepts.values().filter(|c| c.created_at < cutoff).cloned().collect())
    }
}

/// Push-based change feed for single-process use: the Worker or Task
/// Registry caller publishes an event right after observing the transition
/// it just performed, and any local subscriber filtered by `task_id`
/// receives it. Cross-process subscribers need the polling fallback
/// (`logoforge-status-channel::PollingTaskChangeFeed`) instead.
pub struct InMemoryTaskChangeFeed {
    sender: broadcast::Sender<TaskChangeEvent>,
}

impl InMemoryTaskChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }
}

impl Default for InMemoryTaskChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskChangeFeed for InMemoryTaskChangeFeed {
    async fn publish(&self, event: TaskChangeEvent) -> Result<(), MetaStoreError> {
        // No subscribers is not an error: the event is simply dropped.
        let _ = self.sender.send(event);
        Ok(())
    }

    async fn subscribe(&self, task_id: Uuid) -> Result<BoxStream<'static, TaskChangeEvent>, MetaStoreError> {
        Ok(Box::pin(terminal_inclusive_stream(self.sender.subscribe(), task_id)))
    }
}

fn terminal_inclusive_stream(
    receiver: broadcast::Receiver<TaskChangeEvent>,
    task_id: Uuid,
) -> impl futures::Stream<Item = TaskChangeEvent> {
    async_stream::stream! {
        let mut receiver = receiver;
        loop {
            match receiver.recv().await {
                Ok(event) if event.task_id == task_id => {
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use logoforge_domain::TaskStatus;

    fn sample_concept(user_id: Uuid) -> Concept {
        Concept {
            concept_id: Uuid::new_v4(),
            user_id,
            logo_description: "a fox".into(),
            theme_description: "forest".into(),
            base_image_path: "concepts/base.png".into(),
            created_at: Utc::now(),
            variations: vec![],
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = InMemoryConceptStore::new();
        let concept = sample_concept(Uuid::new_v4());
        store.insert_concept(concept.clone()).await.unwrap();
        let fetched = store.get_concept(concept.concept_id).await.unwrap().unwrap();
        assert_eq!(fetched.concept_id, concept.concept_id);
    }

    #[tokio::test]
    async fn list_for_user_excludes_other_users_newest_first() {
        let store = InMemoryConceptStore::new();
        let user_id = Uuid::new_v4();
        let other = sample_concept(Uuid::new_v4());
        store.insert_concept(other).await.unwrap();
        let first = sample_concept(user_id);
        store.insert_concept(first.clone()).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let mut second = sample_concept(user_id);
        second.created_at = Utc::now();
        store.insert_concept(second.clone()).await.unwrap();

        let listed = store.list_concepts_for_user(user_id, 10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].concept_id, second.concept_id);
    }

    #[tokio::test]
    async fn delete_cascade_removes_concept() {
        let store = InMemoryConceptStore::new();
        let concept = sample_concept(Uuid::new_v4());
        store.insert_concept(concept.clone()).await.unwrap();
        store.delete_concept_cascade(concept.concept_id).await.unwrap();
        assert!(store.get_concept(concept.concept_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscriber_receives_matching_events_and_closes_after_terminal() {
        let feed = InMemoryTaskChangeFeed::new();
        let task_id = Uuid::new_v4();
        let mut stream = feed.subscribe(task_id).await.unwrap();

        feed.publish(TaskChangeEvent {
            task_id,
            old_status: Some(TaskStatus::Pending),
            new_status: TaskStatus::Processing,
            result_id: None,
            error_message: None,
        })
        .await
        .unwrap();
        feed.publish(TaskChangeEvent {
            task_id: Uuid::new_v4(),
            old_status: Some(TaskStatus::Pending),
            new_status: TaskStatus::Processing,
            result_id: None,
            error_message: None,
        })
        .await
        .unwrap();
        feed.publish(TaskChangeEvent {
            task_id,
            old_status: Some(TaskStatus::Processing),
            new_status: TaskStatus::Completed,
            result_id: Some(Uuid::new_v4()),
            error_message: None,
        })
        .await
        .unwrap();

        let first = stream.next().await.unwrap();
        assert_eq!(first.new_status, TaskStatus::Processing);
        let second = stream.next().await.unwrap();
        assert_eq!(second.new_status, TaskStatus::Completed);
        assert!(stream.next().await.is_none());
    }
}
