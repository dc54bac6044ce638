use std::sync::Arc;

use engram_core::errors::EngramResult;
use engram_core::memory::{AssociationDirection, Memory, MemoryType, NodeKind, Provenance, RelationKind, Scope};
use engram_core::traits::{GraphStore, MemoryStore};
use engram_graph::GraphBuilder;
use engram_memory::GraphHook;
use engram_providers::llm::{ConversationTurn, SimilarMemorySummary};
use engram_providers::mock::{MockEmbedder, MockLlm};
use engram_providers::types::{
    DetectedRelationKind, DetectedRelationship, EpisodeStructure, ExtractedBelief, ExtractedEntity,
    ExtractedProcedure, ImplicitFeedback, SchemaPattern, TensionVerdict,
};
use engram_providers::{Embedder, Llm};
use engram_storage::Store;

/// An LLM stub that extracts one fixed entity per call and optionally
/// declares a relationship with the first similar memory.
struct ScriptedLlm {
    entities: Vec<ExtractedEntity>,
    relationships: Vec<DetectedRelationship>,
}

impl Llm for ScriptedLlm {
    async fn classify(&self, content: &str) -> EngramResult<MemoryType> {
        MockLlm::default().classify(content).await
    }
    async fn extract(&self, conversation: &[ConversationTurn]) -> EngramResult<Vec<ExtractedBelief>> {
        MockLlm::default().extract(conversation).await
    }
    async fn summarize(&self, memories: &[String]) -> EngramResult<String> {
        MockLlm::default().summarize(memories).await
    }
    async fn check_tension(&self, a: &str, b: &str) -> EngramResult<TensionVerdict> {
        MockLlm::default().check_tension(a, b).await
    }
    async fn extract_episode_structure(&self, text: &str) -> EngramResult<EpisodeStructure> {
        MockLlm::default().extract_episode_structure(text).await
    }
    async fn extract_procedure(&self, text: &str) -> EngramResult<Option<ExtractedProcedure>> {
        MockLlm::default().extract_procedure(text).await
    }
    async fn detect_schema_pattern(
        &self,
        cluster: &[engram_providers::llm::ClusterMember],
    ) -> EngramResult<Option<SchemaPattern>> {
        MockLlm::default().detect_schema_pattern(cluster).await
    }
    async fn extract_entities(&self, _text: &str) -> EngramResult<Vec<ExtractedEntity>> {
        Ok(self.entities.clone())
    }
    async fn detect_relationships(
        &self,
        _memory_content: &str,
        _similar: &[SimilarMemorySummary],
    ) -> EngramResult<Vec<DetectedRelationship>> {
        Ok(self.relationships.clone())
    }
    async fn detect_implicit_feedback(
        &self,
        memories: &[String],
        conversation: &[ConversationTurn],
    ) -> EngramResult<Vec<ImplicitFeedback>> {
        MockLlm::default().detect_implicit_feedback(memories, conversation).await
    }
    async fn detect_outcome(&self, text: &str) -> EngramResult<engram_core::memory::Outcome> {
        MockLlm::default().detect_outcome(text).await
    }
}

fn make_builder(llm: ScriptedLlm) -> (GraphBuilder, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = Arc::new(MockEmbedder::default());
    let builder = GraphBuilder::new(store.clone(), store.clone(), store.clone(), embedder, Arc::new(llm));
    (builder, store)
}

async fn seed_memory(store: &Store, scope: &Scope, content: &str, embedder: &MockEmbedder) -> Memory {
    let mut memory = Memory::new(scope.clone(), MemoryType::Fact, content.to_string(), Provenance::User, "test".into());
    memory.embedding = Some(embedder.embed(content).await.unwrap());
    store.create(&memory).await.unwrap();
    memory
}

#[tokio::test]
async fn entity_mentions_create_entity_link_edges_between_memories() {
    let (builder, store) = make_builder(ScriptedLlm {
        entities: vec![ExtractedEntity {
            name: "Acme Corp".to_string(),
            entity_type: "organization".to_string(),
            role: "subject".to_string(),
        }],
        relationships: Vec::new(),
    });
    let scope = Scope::new("t1", "bot-1");
    let embedder = MockEmbedder::default();

    let first = seed_memory(&store, &scope, "Acme Corp is the user's employer", &embedder).await;
    builder.on_memory_created(&scope, &first).await.unwrap();

    let second = seed_memory(&store, &scope, "Acme Corp renewed the contract", &embedder).await;
    builder.on_memory_created(&scope, &second).await.unwrap();

    let neighbors = store
        .get_neighbors(&scope, NodeKind::Memory, second.id, AssociationDirection::Outgoing, None)
        .await
        .unwrap();

    assert!(neighbors.iter().any(|a| a.relation == RelationKind::EntityLink && a.target_id == first.id));
}

#[tokio::test]
async fn relationship_detection_creates_typed_edge() {
    let scope = Scope::new("t1", "bot-1");
    let embedder = MockEmbedder::default();
    let store = Arc::new(Store::open_in_memory().unwrap());

    let first = seed_memory(&store, &scope, "User deployed the service at 9am", &embedder).await;

    let (builder, _store) = {
        let llm = ScriptedLlm {
            entities: Vec::new(),
            relationships: vec![DetectedRelationship {
                target_index: 0,
                relation: DetectedRelationKind::Causal,
                strength: 0.75,
            }],
        };
        let builder = GraphBuilder::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockEmbedder::default()),
            Arc::new(llm),
        );
        (builder, store.clone())
    };

    let second = seed_memory(&store, &scope, "The service crashed at 9:05am", &embedder).await;
    builder.on_memory_created(&scope, &second).await.unwrap();

    let neighbors = store
        .get_neighbors(&scope, NodeKind::Memory, second.id, AssociationDirection::Outgoing, None)
        .await
        .unwrap();

    assert!(neighbors
        .iter()
        .any(|a| a.relation == RelationKind::Causal && a.target_id == first.id && (a.strength - 0.75).abs() < 1e-6));
}

#[tokio::test]
async fn memory_without_embedding_skips_thematic_and_relationship_steps_without_erroring() {
    let (builder, _store) = make_builder(ScriptedLlm {
        entities: Vec::new(),
        relationships: Vec::new(),
    });
    let scope = Scope::new("t1", "bot-1");
    let memory = Memory::new(scope.clone(), MemoryType::Fact, "no embedding here".to_string(), Provenance::User, "test".into());

    builder.on_memory_created(&scope, &memory).await.unwrap();
}
