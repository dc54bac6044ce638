use std::sync::Arc;

use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{Schema, Scope, SCHEMA_MAX_CONF};
use engram_core::traits::SchemaStore;

/// Confidence boost per newly-added piece of evidence on an existing
/// schema (spec §4.11 Stage 4: "boost confidence += 0.02·new_count").
const EVIDENCE_CONFIDENCE_STEP: f64 = 0.02;

pub struct UpsertSchemaRequest {
    pub scope: Scope,
    pub schema_type: String,
    pub name: String,
    pub description: String,
    pub evidence_memories: Vec<Uuid>,
    pub evidence_episodes: Vec<Uuid>,
    /// Confidence to seed a brand-new schema with. Ignored when a schema
    /// of the same `(type, name)` already exists.
    pub initial_confidence: f64,
    /// Embedding of `name+": "+description`, set by the caller (spec
    /// §4.11 Stage 4). Only used when creating a brand-new schema — an
    /// existing schema's embedding is never overwritten by new evidence.
    pub embedding: Option<Vec<f32>>,
}

/// Schema upsert, evidence accumulation, and contradiction handling
/// (spec §4.2, component C4). Schema *formation* from clusters of
/// memories — greedy single-link clustering and the LLM pattern oracle —
/// is the consolidation worker's job (spec §4.11 Stage 4); this service
/// only owns the store-facing create-or-reinforce and match-scoring
/// surface shared by the consolidation worker and working memory.
pub struct SchemaService {
    schemas: Arc<dyn SchemaStore>,
}

impl SchemaService {
    pub fn new(schemas: Arc<dyn SchemaStore>) -> Self {
        Self { schemas }
    }

    pub async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Schema>> {
        self.schemas.get(scope, id).await
    }

    pub async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Schema>> {
        self.schemas.list_by_agent(scope).await
    }

    /// Create a schema of `(schema_type, name)` if none exists, otherwise
    /// merge in the new evidence and boost confidence (spec §4.11 Stage 4).
    pub async fn upsert(&self, req: UpsertSchemaRequest) -> EngramResult<Schema> {
        match self.schemas.get_by_name(&req.scope, &req.schema_type, &req.name).await? {
            Some(existing) => {
                let new_memories: Vec<Uuid> = req
                    .evidence_memories
                    .iter()
                    .filter(|id| !existing.evidence_memories.contains(id))
                    .copied()
                    .collect();
                let new_episodes: Vec<Uuid> = req
                    .evidence_episodes
                    .iter()
                    .filter(|id| !existing.evidence_episodes.contains(id))
                    .copied()
                    .collect();
                let new_count = new_memories.len() + new_episodes.len();

                if new_count > 0 {
                    self.schemas.add_evidence(&req.scope, existing.id, &new_memories, &new_episodes).await?;
                    let boosted = (existing.confidence + EVIDENCE_CONFIDENCE_STEP * new_count as f64).min(SCHEMA_MAX_CONF);
                    self.schemas.update_confidence(&req.scope, existing.id, boosted).await?;
                }

                Ok(self.schemas.get(&req.scope, existing.id).await?.unwrap_or(existing))
            }
            None => {
                let mut schema = Schema::new(
                    req.scope.clone(),
                    req.schema_type,
                    req.name,
                    req.description,
                    req.evidence_memories,
                    req.evidence_episodes,
                    req.initial_confidence,
                );
                schema.embedding = req.embedding;
                self.schemas.create(&schema).await?;
                Ok(schema)
            }
        }
    }

    /// Record a contradiction against a schema; confidence is
    /// monotone-decreasing (spec §3 invariant).
    pub async fn record_contradiction(&self, scope: &Scope, id: Uuid, penalty: f64) -> EngramResult<()> {
        self.schemas.record_contradiction(scope, id, penalty).await
    }

    pub async fn record_validation(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        self.schemas.record_validation(scope, id).await
    }
}

#[cfg(test)]
mod tests {
    use engram_storage::Store;

    use super::*;

    fn service() -> SchemaService {
        let store = Arc::new(Store::open_in_memory().unwrap());
        SchemaService::new(store)
    }

    #[tokio::test]
    async fn upsert_creates_new_schema_when_none_matches() {
        let service = service();
        let scope = Scope::new("t1", "bot-1");

        let schema = service
            .upsert(UpsertSchemaRequest {
                scope: scope.clone(),
                schema_type: "user_archetype".to_string(),
                name: "night_owl".to_string(),
                description: "works late".to_string(),
                evidence_memories: vec![Uuid::new_v4(); 5],
                evidence_episodes: vec![],
                initial_confidence: 0.6,
                embedding: None,
            })
            .await
            .unwrap();

        assert_eq!(schema.evidence_count, 5);
        assert!((schema.confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn upsert_merges_evidence_and_boosts_confidence_on_existing_schema() {
        let service = service();
        let scope = Scope::new("t1", "bot-1");
        let shared = Uuid::new_v4();

        let first = service
            .upsert(UpsertSchemaRequest {
                scope: scope.clone(),
                schema_type: "user_archetype".to_string(),
                name: "night_owl".to_string(),
                description: "works late".to_string(),
                evidence_memories: vec![shared],
                evidence_episodes: vec![],
                initial_confidence: 0.5,
                embedding: None,
            })
            .await
            .unwrap();

        let fresh_ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let second = service
            .upsert(UpsertSchemaRequest {
                scope: scope.clone(),
                schema_type: "user_archetype".to_string(),
                name: "night_owl".to_string(),
                description: "works late".to_string(),
                evidence_memories: vec![shared, fresh_ids[0], fresh_ids[1]],
                evidence_episodes: vec![],
                initial_confidence: 0.9,
                embedding: None,
            })
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.evidence_count, 3);
        assert!((second.confidence - (0.5 + 0.04)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn record_contradiction_is_monotone_decreasing() {
        let service = service();
        let scope = Scope::new("t1", "bot-1");
        let schema = service
            .upsert(UpsertSchemaRequest {
                scope: scope.clone(),
                schema_type: "situation_template".to_string(),
                name: "standup".to_string(),
                description: "daily standup".to_string(),
                evidence_memories: vec![Uuid::new_v4(); 5],
                evidence_episodes: vec![],
                initial_confidence: 0.7,
                embedding: None,
            })
            .await
            .unwrap();

        service.record_contradiction(&scope, schema.id, 0.3).await.unwrap();
        let updated = service.get(&scope, schema.id).await.unwrap().unwrap();
        assert!((updated.confidence - 0.4).abs() < 1e-9);
        assert_eq!(updated.contradiction_count, 1);
    }
}
