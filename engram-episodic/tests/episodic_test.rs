use std::sync::Arc;

use chrono::{Duration, Utc};
use engram_core::memory::Scope;
use engram_episodic::{EncodeEpisodeRequest, EpisodeService, RecallMode};
use engram_providers::mock::{MockEmbedder, MockLlm};
use engram_storage::Store;

fn make_service() -> (EpisodeService, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let service = EpisodeService::new(
        store.clone(),
        store.clone(),
        Arc::new(MockEmbedder::default()),
        Arc::new(MockLlm::default()),
    );
    (service, store)
}

#[tokio::test]
async fn encode_rejects_empty_content() {
    let (service, _store) = make_service();
    let err = service
        .encode(EncodeEpisodeRequest {
            scope: Scope::new("t1", "bot-1"),
            raw_content: "   ".to_string(),
            conversation_id: None,
            occurred_at: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EPISODE_CONTENT_EMPTY");
}

#[tokio::test]
async fn encode_derives_defaults_and_persists() {
    let (service, _store) = make_service();
    let scope = Scope::new("t1", "bot-1");
    let episode = service
        .encode(EncodeEpisodeRequest {
            scope: scope.clone(),
            raw_content: "User asked for a refund and was upset".to_string(),
            conversation_id: Some("conv-1".to_string()),
            occurred_at: None,
        })
        .await
        .unwrap();

    assert_eq!(episode.consolidation_status, engram_core::memory::ConsolidationStatus::Raw);
    assert!((episode.memory_strength - 1.0).abs() < 1e-6);
    assert_eq!(episode.access_count, 1);
    assert!(episode.embedding.is_some());

    let fetched = service.get(&scope, episode.id).await.unwrap();
    assert_eq!(fetched.id, episode.id);
}

#[tokio::test]
async fn encode_links_similar_prior_episodes_thematically() {
    let (service, store) = make_service();
    let scope = Scope::new("t1", "bot-1");

    let first = service
        .encode(EncodeEpisodeRequest {
            scope: scope.clone(),
            raw_content: "shared content for similarity".to_string(),
            conversation_id: None,
            occurred_at: None,
        })
        .await
        .unwrap();

    let second = service
        .encode(EncodeEpisodeRequest {
            scope: scope.clone(),
            raw_content: "shared content for similarity".to_string(),
            conversation_id: None,
            occurred_at: None,
        })
        .await
        .unwrap();

    use engram_core::traits::GraphStore;
    let neighbors = store
        .get_neighbors(
            &scope,
            engram_core::memory::NodeKind::Episode,
            second.id,
            engram_core::memory::AssociationDirection::Outgoing,
            None,
        )
        .await
        .unwrap();
    assert!(neighbors.iter().any(|n| n.target_id == first.id));
}

#[tokio::test]
async fn record_outcome_rejects_unknown_outcome_string() {
    let (service, _store) = make_service();
    let scope = Scope::new("t1", "bot-1");
    let episode = service
        .encode(EncodeEpisodeRequest {
            scope: scope.clone(),
            raw_content: "episode content".to_string(),
            conversation_id: None,
            occurred_at: None,
        })
        .await
        .unwrap();

    let err = service.record_outcome(&scope, episode.id, "catastrophic").await.unwrap_err();
    assert_eq!(err.code(), "INVALID_OUTCOME");

    service.record_outcome(&scope, episode.id, "success").await.unwrap();
    let fetched = service.get(&scope, episode.id).await.unwrap();
    assert_eq!(fetched.outcome, engram_core::memory::Outcome::Success);
}

#[tokio::test]
async fn recall_by_time_range_returns_episodes_in_window() {
    let (service, _store) = make_service();
    let scope = Scope::new("t1", "bot-1");
    let now = Utc::now();

    let episode = service
        .encode(EncodeEpisodeRequest {
            scope: scope.clone(),
            raw_content: "time range episode".to_string(),
            conversation_id: None,
            occurred_at: Some(now),
        })
        .await
        .unwrap();

    let found = service
        .recall(
            &scope,
            RecallMode::TimeRange {
                start: now - Duration::hours(1),
                end: now + Duration::hours(1),
            },
        )
        .await
        .unwrap();
    assert!(found.iter().any(|e| e.id == episode.id));
}

#[tokio::test]
async fn recall_semantic_rejects_empty_query() {
    let (service, _store) = make_service();
    let scope = Scope::new("t1", "bot-1");
    let err = service
        .recall(&scope, RecallMode::Semantic { query: "  ".to_string(), top_k: 5 })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "RECALL_QUERY_EMPTY");
}
