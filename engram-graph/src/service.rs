use std::sync::Arc;

use tracing::warn;

use engram_core::errors::EngramResult;
use engram_core::memory::{Association, Entity, EntityMention, Memory, NodeKind, RelationKind, Scope};
use engram_core::traits::{EntityStore, GraphStore, MemoryStore};
use engram_memory::GraphHook;
use engram_providers::llm::SimilarMemorySummary;
use engram_providers::types::DetectedRelationKind;
use engram_providers::{Embedder, Llm};

/// Embedding-similarity threshold for entity resolution's second tier
/// (spec §4.8 step 2).
const ENTITY_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Threshold for thematic-link discovery (spec §4.8 step 5).
const THEMATIC_THRESHOLD: f32 = 0.8;

/// Minimum similarity and candidate count for relationship detection
/// (spec §4.8 step 6).
const RELATIONSHIP_THRESHOLD: f32 = 0.5;
const RELATIONSHIP_CANDIDATES: usize = 5;

/// Entity resolution and association-graph builder (spec §4.8, C8).
/// Wired into `engram-memory` as a [`GraphHook`]; every failure inside
/// [`Self::on_memory_created`] is logged and swallowed so a belief write
/// never fails because the graph side effect did.
pub struct GraphBuilder {
    memories: Arc<dyn MemoryStore>,
    entities: Arc<dyn EntityStore>,
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
}

impl GraphBuilder {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        entities: Arc<dyn EntityStore>,
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
    ) -> Self {
        Self {
            memories,
            entities,
            graph,
            embedder,
            llm,
        }
    }

    /// Resolve one extracted entity name to a persisted [`Entity`],
    /// creating it if nothing matches (spec §4.8 step 2).
    async fn resolve_entity(&self, scope: &Scope, entity_type: &str, name: &str) -> EngramResult<Entity> {
        if let Some(existing) = self.entities.find_by_name(scope, entity_type, name).await? {
            return Ok(existing);
        }

        let embedding = self.embedder.embed(name).await.ok();

        if let Some(emb) = &embedding {
            let mut candidates = self
                .entities
                .find_similar(scope, entity_type, emb, ENTITY_SIMILARITY_THRESHOLD)
                .await?;
            candidates.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
            if let Some(best) = candidates.into_iter().next() {
                self.entities.add_alias(scope, best.entity.id, name).await?;
                return Ok(best.entity);
            }
        }

        let entity = Entity::new(scope.clone(), name.to_string(), entity_type.to_string(), embedding);
        self.entities.create(&entity).await?;
        Ok(entity)
    }

    /// Steps 1-4: extract entities, resolve, record mentions, and link
    /// every other memory sharing an entity.
    async fn link_entities(&self, scope: &Scope, memory: &Memory) -> EngramResult<()> {
        let extracted = self.llm.extract_entities(&memory.content).await?;

        for candidate in extracted {
            let entity = self
                .resolve_entity(scope, &candidate.entity_type, &candidate.name)
                .await?;

            let mention = EntityMention::new(entity.id, memory.id, candidate.role.clone());
            self.entities.record_mention(scope, &mention).await?;

            for (other_memory_id, other_role) in self.entities.memories_mentioning(scope, entity.id).await? {
                if other_memory_id == memory.id {
                    continue;
                }
                let other_weight = EntityMention::new(entity.id, other_memory_id, other_role).role_weight();
                let strength = (mention.role_weight() * other_weight).sqrt();
                let edge = Association::new(
                    scope.clone(),
                    NodeKind::Memory,
                    memory.id,
                    NodeKind::Memory,
                    other_memory_id,
                    RelationKind::EntityLink,
                    strength,
                );
                self.graph.create_edge(&edge).await?;
            }
        }

        Ok(())
    }

    /// Step 5: thematic links to every memory above the similarity floor.
    async fn link_thematic(&self, scope: &Scope, memory: &Memory, embedding: &[f32]) -> EngramResult<()> {
        let similar = self
            .memories
            .find_similar(scope, embedding, THEMATIC_THRESHOLD, Some(memory.id))
            .await?;

        for hit in similar {
            let edge = Association::new(
                scope.clone(),
                NodeKind::Memory,
                memory.id,
                NodeKind::Memory,
                hit.memory.id,
                RelationKind::Thematic,
                hit.similarity,
            );
            self.graph.create_edge(&edge).await?;
        }

        Ok(())
    }

    /// Step 6: LLM-adjudicated typed relationships among the closest
    /// similar memories.
    async fn link_relationships(&self, scope: &Scope, memory: &Memory, embedding: &[f32]) -> EngramResult<()> {
        let mut similar = self
            .memories
            .find_similar(scope, embedding, RELATIONSHIP_THRESHOLD, Some(memory.id))
            .await?;
        similar.truncate(RELATIONSHIP_CANDIDATES);

        if similar.is_empty() {
            return Ok(());
        }

        let summaries: Vec<SimilarMemorySummary> = similar
            .iter()
            .map(|hit| SimilarMemorySummary {
                content: hit.memory.content.clone(),
                memory_type: hit.memory.memory_type,
            })
            .collect();

        let detected = self.llm.detect_relationships(&memory.content, &summaries).await?;

        for rel in detected {
            let Some(target) = similar.get(rel.target_index) else {
                continue;
            };
            let relation = match rel.relation {
                DetectedRelationKind::Causal => RelationKind::Causal,
                DetectedRelationKind::Contradicts => RelationKind::Contradicts,
                DetectedRelationKind::Thematic => RelationKind::Thematic,
            };
            let edge = Association::new(
                scope.clone(),
                NodeKind::Memory,
                memory.id,
                NodeKind::Memory,
                target.memory.id,
                relation,
                rel.strength,
            );
            self.graph.create_edge(&edge).await?;
        }

        Ok(())
    }

    async fn build(&self, scope: &Scope, memory: &Memory) -> EngramResult<()> {
        if let Err(e) = self.link_entities(scope, memory).await {
            warn!(memory_id = %memory.id, error = %e, "entity linking failed");
        }

        let Some(embedding) = memory.embedding.as_deref() else {
            return Ok(());
        };

        if let Err(e) = self.link_thematic(scope, memory, embedding).await {
            warn!(memory_id = %memory.id, error = %e, "thematic linking failed");
        }

        if let Err(e) = self.link_relationships(scope, memory, embedding).await {
            warn!(memory_id = %memory.id, error = %e, "relationship detection failed");
        }

        Ok(())
    }
}

impl GraphHook for GraphBuilder {
    async fn on_memory_created(&self, scope: &Scope, memory: &Memory) -> EngramResult<()> {
        self.build(scope, memory).await
    }
}
