use std::sync::Arc;

use engram_core::config::WorkingMemoryConfig;
use engram_core::memory::{Memory, MemoryType, NodeKind, Provenance, Schema, Scope};
use engram_core::traits::{MemoryStore, SchemaStore};
use engram_providers::mock::MockEmbedder;
use engram_providers::Embedder;
use engram_storage::Store;
use engram_working_memory::{ActivateRequest, WorkingMemoryService};

fn service(store: Arc<Store>) -> WorkingMemoryService {
    WorkingMemoryService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(MockEmbedder::default()),
        WorkingMemoryConfig::default(),
    )
}

#[tokio::test]
async fn direct_recall_activates_a_matching_memory() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = MockEmbedder::default();
    let scope = Scope::new("t1", "bot-1");

    let mut memory = Memory::new(scope.clone(), MemoryType::Fact, "the user prefers dark mode".to_string(), Provenance::User, "test".into());
    memory.embedding = Some(embedder.embed(&memory.content).await.unwrap());
    store.create(&memory).await.unwrap();

    let wm = service(store.clone());
    let mut req = ActivateRequest::new(scope.clone());
    req.cues.push("the user prefers dark mode".to_string());

    let session = wm.activate(req).await.unwrap();
    assert!(session.items.iter().any(|i| i.node_type == NodeKind::Memory && i.node_id == memory.id));
}

#[tokio::test]
async fn schema_step_activates_matching_schema_above_threshold() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");

    let mut schema = Schema::new(scope.clone(), "preference".to_string(), "dark_mode_lovers".to_string(), "users who like dark UIs".to_string(), vec![], vec![], 0.8);
    schema.applicable_contexts = vec!["dark mode".to_string()];
    store.create(&schema).await.unwrap();

    let wm = service(store.clone());
    let mut req = ActivateRequest::new(scope.clone());
    req.cues.push("please enable dark mode".to_string());

    let session = wm.activate(req).await.unwrap();
    assert!(session.items.iter().any(|i| i.node_type == NodeKind::Schema && i.node_id == schema.id));
}

#[tokio::test]
async fn activation_persists_session_retrievable_by_get() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let scope = Scope::new("t1", "bot-1");

    let wm = service(store.clone());
    let mut req = ActivateRequest::new(scope.clone());
    req.goal = Some("ship the release".to_string());

    wm.activate(req).await.unwrap();
    let fetched = wm.get(&scope).await.unwrap();
    assert!(fetched.is_some());
    assert_eq!(fetched.unwrap().current_goal.as_deref(), Some("ship the release"));
}

#[tokio::test]
async fn slot_competition_caps_items_at_max_slots() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let embedder = MockEmbedder::default();
    let scope = Scope::new("t1", "bot-1");

    let mut config = WorkingMemoryConfig::default();
    config.max_slots = 2;
    config.direct_semantic_min = 0.0;

    for i in 0..5 {
        let mut memory = Memory::new(scope.clone(), MemoryType::Fact, format!("fact number {i}"), Provenance::User, "test".into());
        memory.embedding = Some(embedder.embed(&memory.content).await.unwrap());
        store.create(&memory).await.unwrap();
    }

    let wm = WorkingMemoryService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(MockEmbedder::default()),
        config,
    );
    let mut req = ActivateRequest::new(scope.clone());
    req.cues.push("fact".to_string());

    let session = wm.activate(req).await.unwrap();
    assert!(session.items.len() <= 2);
    assert!(session.items.iter().all(|i| i.slot_position.is_some()));
}
