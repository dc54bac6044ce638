use std::sync::Arc;

use engram_core::memory::{
    Association, AssociationDirection, Memory, MemoryType, NodeKind, Provenance, RelationKind, Scope,
};
use engram_core::traits::{GraphStore, MemoryStore};
use engram_providers::mock::MockEmbedder;
use engram_providers::Embedder;
use engram_retrieval::hybrid::{HybridRecall, HybridRecallRequest};
use engram_storage::Store;

async fn seed(store: &Store, embedder: &MockEmbedder, scope: &Scope, content: &str) -> Memory {
    let mut memory = Memory::new(scope.clone(), MemoryType::Fact, content.to_string(), Provenance::User, "test".into());
    memory.embedding = Some(embedder.embed(content).await.unwrap());
    store.create(&memory).await.unwrap();
    memory
}

#[tokio::test]
async fn graph_stage_surfaces_neighbors_of_a_vector_seed() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = MockEmbedder::default();
    let scope = Scope::new("t1", "bot-1");

    let seed_memory = seed(&store, &embedder, &scope, "the deploy pipeline failed").await;
    let neighbor = seed(&store, &embedder, &scope, "rollback was triggered automatically").await;

    let edge = Association::new(
        scope.clone(),
        NodeKind::Memory,
        seed_memory.id,
        NodeKind::Memory,
        neighbor.id,
        RelationKind::Causal,
        0.9,
    );
    store.create_edge(&edge).await.unwrap();

    let hybrid = HybridRecall::new(store.clone(), store.clone(), store.clone(), Arc::new(MockEmbedder::default()));
    let req = HybridRecallRequest {
        scope: scope.clone(),
        query: "the deploy pipeline failed".to_string(),
        ..HybridRecallRequest::default()
    };

    let results = hybrid.recall(&req).await.unwrap();
    assert!(results.iter().any(|r| r.memory.id == neighbor.id));
    let neighbor_result = results.iter().find(|r| r.memory.id == neighbor.id).unwrap();
    assert!(neighbor_result.graph_relevance > 0.0);
}

#[tokio::test]
async fn disabling_graph_expansion_skips_pure_graph_neighbors() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = MockEmbedder::default();
    let scope = Scope::new("t1", "bot-1");

    let seed_memory = seed(&store, &embedder, &scope, "alpha beta gamma delta").await;
    let neighbor = seed(&store, &embedder, &scope, "zzzzzzzzzzzzzzzzzzzzzzzz").await;

    let edge = Association::new(
        scope.clone(),
        NodeKind::Memory,
        seed_memory.id,
        NodeKind::Memory,
        neighbor.id,
        RelationKind::Thematic,
        0.95,
    );
    store.create_edge(&edge).await.unwrap();

    let hybrid = HybridRecall::new(store.clone(), store.clone(), store.clone(), Arc::new(MockEmbedder::default()));
    let req = HybridRecallRequest {
        scope: scope.clone(),
        query: "alpha beta gamma delta".to_string(),
        enable_graph: false,
        ..HybridRecallRequest::default()
    };

    let results = hybrid.recall(&req).await.unwrap();
    assert!(results.iter().all(|r| r.graph_relevance == 0.0));
}

#[tokio::test]
async fn get_neighbors_respects_relation_filter() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");
    let embedder = MockEmbedder::default();
    let a = seed(&store, &embedder, &scope, "source node").await;
    let b = seed(&store, &embedder, &scope, "target node").await;

    let edge = Association::new(scope.clone(), NodeKind::Memory, a.id, NodeKind::Memory, b.id, RelationKind::Contradicts, 0.9);
    store.create_edge(&edge).await.unwrap();

    let neighbors = store
        .get_neighbors(&scope, NodeKind::Memory, a.id, AssociationDirection::Outgoing, Some(&[RelationKind::Causal]))
        .await
        .unwrap();
    assert!(neighbors.is_empty());
}
