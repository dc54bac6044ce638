use std::sync::Arc;

use engram_core::memory::{Episode, Memory, MemoryType, Outcome, Provenance, Scope};
use engram_core::traits::{EpisodeStore, MemoryStore};
use engram_learning::{FeedbackService, RecordFeedbackRequest};
use engram_storage::Store;

fn service(store: Arc<Store>) -> FeedbackService {
    FeedbackService::new(store.clone(), store.clone(), store.clone(), store)
}

#[tokio::test]
async fn helpful_signal_boosts_confidence_and_reinforcement() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");
    let mut memory = Memory::new(scope.clone(), MemoryType::Fact, "the sky is blue".to_string(), Provenance::User, "test".into());
    memory.confidence = 0.6;
    store.create(&memory).await.unwrap();

    let fb = service(store.clone());
    let feedback = fb
        .record(RecordFeedbackRequest {
            scope: scope.clone(),
            memory_id: memory.id,
            signal: "helpful".to_string(),
            implicit: false,
            detector_confidence: None,
        })
        .await
        .unwrap();
    assert_eq!(feedback.memory_id, memory.id);

    let updated = store.get(&scope, memory.id).await.unwrap().unwrap();
    assert!(updated.confidence > 0.6);
    assert_eq!(updated.reinforcement_count, 1);
}

#[tokio::test]
async fn contradicted_signal_sets_needs_review() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");
    let memory = Memory::new(scope.clone(), MemoryType::Fact, "paris is the capital of france".to_string(), Provenance::User, "test".into());
    store.create(&memory).await.unwrap();

    let fb = service(store.clone());
    fb.record(RecordFeedbackRequest {
        scope: scope.clone(),
        memory_id: memory.id,
        signal: "contradicted".to_string(),
        implicit: false,
        detector_confidence: None,
    })
    .await
    .unwrap();

    let updated = store.get(&scope, memory.id).await.unwrap().unwrap();
    assert!(updated.needs_review);
}

#[tokio::test]
async fn unknown_signal_is_rejected() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");
    let memory = Memory::new(scope.clone(), MemoryType::Fact, "x".to_string(), Provenance::User, "test".into());
    store.create(&memory).await.unwrap();

    let fb = service(store.clone());
    let err = fb
        .record(RecordFeedbackRequest {
            scope: scope.clone(),
            memory_id: memory.id,
            signal: "bogus".to_string(),
            implicit: false,
            detector_confidence: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "FEEDBACK_INVALID_SIGNAL");
}

#[tokio::test]
async fn implicit_feedback_below_confidence_floor_is_ignored() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");
    let memory = Memory::new(scope.clone(), MemoryType::Fact, "x".to_string(), Provenance::User, "test".into());
    store.create(&memory).await.unwrap();

    let fb = service(store.clone());
    let result = fb
        .record_implicit(RecordFeedbackRequest {
            scope: scope.clone(),
            memory_id: memory.id,
            signal: "helpful".to_string(),
            implicit: true,
            detector_confidence: Some(0.4),
        })
        .await
        .unwrap();
    assert!(result.is_none());

    let unchanged = store.get(&scope, memory.id).await.unwrap().unwrap();
    assert_eq!(unchanged.confidence, memory.confidence);
}

#[tokio::test]
async fn episode_success_propagates_helpful_to_derived_memories() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");

    let mut memory = Memory::new(scope.clone(), MemoryType::Fact, "derived belief".to_string(), Provenance::User, "test".into());
    memory.confidence = 0.5;
    store.create(&memory).await.unwrap();

    let mut episode = Episode::new(scope.clone(), "something happened".to_string(), None);
    episode.outcome = Outcome::Success;
    episode.derived_semantic_ids.push(memory.id);
    store.create(&episode).await.unwrap();

    let fb = service(store.clone());
    let applied = fb.propagate_episode_outcome(&scope, episode.id).await.unwrap();
    assert_eq!(applied, 1);

    let updated = store.get(&scope, memory.id).await.unwrap().unwrap();
    assert!(updated.confidence > 0.5);
}

#[tokio::test]
async fn episode_neutral_outcome_propagates_nothing() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");

    let mut episode = Episode::new(scope.clone(), "something happened".to_string(), None);
    episode.outcome = Outcome::Neutral;
    store.create(&episode).await.unwrap();

    let fb = service(store.clone());
    let applied = fb.propagate_episode_outcome(&scope, episode.id).await.unwrap();
    assert_eq!(applied, 0);
}
