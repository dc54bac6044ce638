use std::sync::Arc;

use engram_core::config::RetrievalConfig;
use engram_core::memory::{MemoryType, Provenance, Scope};
use engram_core::traits::RecallOptions;
use engram_memory::{CreateMemoryRequest, MemoryService, NoopGraphHook};
use engram_policy::PolicyService;
use engram_providers::llm::ConversationTurn;
use engram_providers::mock::{MockEmbedder, MockLlm};
use engram_providers::types::{
    EpisodeStructure, ExtractedBelief, ExtractedEntity, ExtractedProcedure, SchemaPattern, TensionKind,
    TensionVerdict,
};
use engram_providers::Llm;
use engram_storage::Store;

/// An LLM stub whose `check_tension` verdict is fixed for every call,
/// used to drive the reconciliation branches deterministically.
struct ScriptedLlm {
    verdict: TensionVerdict,
}

impl Llm for ScriptedLlm {
    async fn classify(&self, content: &str) -> engram_core::errors::EngramResult<MemoryType> {
        MockLlm::default().classify(content).await
    }
    async fn extract(&self, conversation: &[ConversationTurn]) -> engram_core::errors::EngramResult<Vec<ExtractedBelief>> {
        MockLlm::default().extract(conversation).await
    }
    async fn summarize(&self, memories: &[String]) -> engram_core::errors::EngramResult<String> {
        MockLlm::default().summarize(memories).await
    }
    async fn check_tension(&self, _a: &str, _b: &str) -> engram_core::errors::EngramResult<TensionVerdict> {
        Ok(self.verdict)
    }
    async fn extract_episode_structure(&self, text: &str) -> engram_core::errors::EngramResult<EpisodeStructure> {
        MockLlm::default().extract_episode_structure(text).await
    }
    async fn extract_procedure(&self, text: &str) -> engram_core::errors::EngramResult<Option<ExtractedProcedure>> {
        MockLlm::default().extract_procedure(text).await
    }
    async fn detect_schema_pattern(&self, cluster: &[engram_providers::llm::ClusterMember]) -> engram_core::errors::EngramResult<Option<SchemaPattern>> {
        MockLlm::default().detect_schema_pattern(cluster).await
    }
    async fn extract_entities(&self, text: &str) -> engram_core::errors::EngramResult<Vec<ExtractedEntity>> {
        MockLlm::default().extract_entities(text).await
    }
    async fn detect_relationships(
        &self,
        memory_content: &str,
        similar: &[engram_providers::llm::SimilarMemorySummary],
    ) -> engram_core::errors::EngramResult<Vec<engram_providers::types::DetectedRelationship>> {
        MockLlm::default().detect_relationships(memory_content, similar).await
    }
    async fn detect_implicit_feedback(
        &self,
        memories: &[String],
        conversation: &[ConversationTurn],
    ) -> engram_core::errors::EngramResult<Vec<engram_providers::types::ImplicitFeedback>> {
        MockLlm::default().detect_implicit_feedback(memories, conversation).await
    }
    async fn detect_outcome(&self, text: &str) -> engram_core::errors::EngramResult<engram_core::memory::Outcome> {
        MockLlm::default().detect_outcome(text).await
    }
}

fn make_service(verdict: TensionVerdict) -> (MemoryService, Arc<Store>) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = Arc::new(MockEmbedder::default());
    let llm = Arc::new(ScriptedLlm { verdict });
    let policy = Arc::new(PolicyService::new(store.clone(), store.clone(), llm.clone(), embedder.clone()));
    let service = MemoryService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        embedder,
        llm,
        policy,
        Arc::new(NoopGraphHook),
        RetrievalConfig::default(),
    );
    (service, store)
}

#[tokio::test]
async fn reinforcement_on_no_tension_matches_end_to_end_scenario_one() {
    let (service, _store) = make_service(TensionVerdict { kind: TensionKind::None, score: 0.0 });

    let first = service
        .create(CreateMemoryRequest {
            scope: Scope::new("t1", "bot-1"),
            memory_type: Some(MemoryType::Preference),
            content: "User prefers dark mode".to_string(),
            confidence: Some(0.85),
            provenance: Provenance::User,
            source: "test".to_string(),
        })
        .await
        .unwrap();
    assert!((first.confidence - 0.85).abs() < 1e-9);
    assert!(!first.reinforced);

    let second = service
        .create(CreateMemoryRequest {
            scope: Scope::new("t1", "bot-1"),
            memory_type: Some(MemoryType::Preference),
            content: "User prefers dark mode".to_string(),
            confidence: None,
            provenance: Provenance::User,
            source: "test".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert!(second.reinforced);
    assert!((second.confidence - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn hard_contradiction_demotes_existing_and_stores_new_at_fixed_confidence() {
    let (service, store) = make_service(TensionVerdict { kind: TensionKind::Hard, score: 0.9 });

    let scope = Scope::new("t1", "bot-1");
    let first = service
        .create(CreateMemoryRequest {
            scope: scope.clone(),
            memory_type: Some(MemoryType::Preference),
            content: "User prefers dark mode".to_string(),
            confidence: Some(0.9),
            provenance: Provenance::User,
            source: "test".to_string(),
        })
        .await
        .unwrap();

    let second = service
        .create(CreateMemoryRequest {
            scope: scope.clone(),
            memory_type: Some(MemoryType::Preference),
            content: "User prefers light mode".to_string(),
            confidence: None,
            provenance: Provenance::User,
            source: "test".to_string(),
        })
        .await
        .unwrap();

    assert_ne!(second.id, first.id);
    assert!((second.confidence - 0.7).abs() < 1e-9);

    let demoted = service.get(&scope, first.id).await.unwrap();
    assert!((demoted.confidence - 0.7).abs() < 1e-9);

    use engram_core::traits::GraphStore;
    let neighbors = store
        .get_neighbors(
            &scope,
            engram_core::memory::NodeKind::Memory,
            second.id,
            engram_core::memory::AssociationDirection::Outgoing,
            None,
        )
        .await
        .unwrap();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].relation, engram_core::memory::RelationKind::Contradicts);
}

#[tokio::test]
async fn recall_rejects_empty_query() {
    let (service, _store) = make_service(TensionVerdict { kind: TensionKind::None, score: 0.0 });
    let scope = Scope::new("t1", "bot-1");
    let err = service.recall(&scope, "   ", &RecallOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), "RECALL_QUERY_EMPTY");
}
