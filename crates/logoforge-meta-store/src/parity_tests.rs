//! Shared parity test bodies run against every `ConceptStore` backend.

use std::sync::Arc;

use chrono::Utc;
use logoforge_domain::{Concept, Variation};
use uuid::Uuid;

use crate::traits::ConceptStore;

fn sample_concept(user_id: Uuid, num_variations: usize) -> Concept {
    let concept_id = Uuid::new_v4();
    let variations = (0..num_variations)
        .map(|i| Variation {
            variation_id: Uuid::new_v4(),
            concept_id,
            palette_name: format!("palette-{i}"),
            colors: vec!["#111111".into(), "#222222".into(), "#333333".into(), "#444444".into(), "#555555".into()],
            image_path: format!("variations/{concept_id}/{i}.png"),
            created_at: Utc::now(),
        })
        .collect();

    Concept {
        concept_id,
        user_id,
        logo_description: "a minimalist fox".into(),
        theme_description: "forest green and cream".into(),
        base_image_path: format!("concepts/{concept_id}/base.png"),
        created_at: Utc::now(),
        variations,
    }
}

pub async fn insert_then_get_includes_variations(store: Arc<dyn ConceptStore>) {
    let concept = sample_concept(Uuid::new_v4(), 3);
    store.insert_concept(concept.clone()).await.unwrap();

    let fetched = store.get_concept(concept.concept_id).await.unwrap().unwrap();
    assert_eq!(fetched.concept_id, concept.concept_id);
    assert_eq!(fetched.variations.len(), 3);
}

pub async fn get_missing_concept_returns_none(store: Arc<dyn ConceptStore>) {
    assert!(store.get_concept(Uuid::new_v4()).await.unwrap().is_none());
}

pub async fn list_for_user_is_scoped_and_newest_first(store: Arc<dyn ConceptStore>) {
    let user_id = Uuid::new_v4();
    let other_user = sample_concept(Uuid::new_v4(), 0);
    store.insert_concept(other_user).await.unwrap();

    let first = sample_concept(user_id, 1);
    store.insert_concept(first.clone()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = sample_concept(user_id, 1);
    store.insert_concept(second.clone()).await.unwrap();

    let listed = store.list_concepts_for_user(user_id, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].concept_id, second.concept_id);
}

pub async fn list_for_user_respects_limit(store: Arc<dyn ConceptStore>) {
    let user_id = Uuid::new_v4();
    for _ in 0..5 {
        store.insert_concept(sample_concept(user_id, 0)).await.unwrap();
    }
    let listed = store.list_concepts_for_user(user_id, 2).await.unwrap();
    assert_eq!(listed.len(), 2);
}

pub async fn delete_cascade_removes_concept_and_variations(store: Arc<dyn ConceptStore>) {
    let concept = sample_concept(Uuid::new_v4(), 2);
    store.insert_concept(concept.clone()).await.unwrap();
    store.delete_concept_cascade(concept.concept_id).await.unwrap();
    assert!(store.get_concept(concept.concept_id).await.unwrap().is_none());
}

pub async fn list_older_than_reflects_retention_cutoff(store: Arc<dyn ConceptStore>) {
    let user_id = Uuid::new_v4();
    let concept = sample_concept(user_id, 0);
    store.insert_concept(concept.clone()).await.unwrap();

    let before_insert = concept.created_at - chrono::Duration::seconds(1);
    assert!(store.list_concepts_older_than(before_insert).await.unwrap().is_empty());

    let after_insert = concept.created_at + chrono::Duration::seconds(1);
    let stale = store.list_concepts_older_than(after_insert).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].concept_id, concept.concept_id);
}

pub async fn run_all(store: Arc<dyn ConceptStore>) {
    insert_then_get_includes_variations(Arc::clone(&store)).await;
    get_missing_concept_returns_none(Arc::clone(&store)).await;
    list_for_user_is_scoped_and_newest_first(Arc::clone(&store)).await;
    list_for_user_respects_limit(Arc::clone(&store)).await;
    delete_cascade_removes_concept_and_variations(Arc::clone(&store)).await;
    list_older_than_reflects_retention_cutoff(store).await;
}

#[cfg(test)]
mod in_memory_parity {
    use super::*;
    use crate::in_memory::InMemoryConceptStore;

    #[tokio::test]
    async fn runs_full_parity_suite() {
        run_all(Arc::new(InMemoryConceptStore::new())).await;
    }
}
