//! Stage 1 — episode processing (spec §4.11).

use engram_core::errors::EngramResult;
use engram_core::memory::{Association, ConsolidationStatus, NodeKind, Outcome, RelationKind, Scope};
use engram_core::traits::EpisodeStructureUpdate;

use super::ConsolidationWorker;

impl ConsolidationWorker {
    pub(super) async fn stage1_episode_processing(&self, scope: &Scope) -> EngramResult<()> {
        let episodes = self
            .episodes
            .get_by_consolidation_status(scope, ConsolidationStatus::Raw, self.config.episode_batch_size)
            .await?;

        for mut episode in episodes {
            let needs_enrichment =
                episode.importance_score >= self.config.stage1_min_importance || matches!(episode.outcome, Outcome::Success | Outcome::Failure);

            if needs_enrichment {
                match self.llm.extract_episode_structure(&episode.raw_content).await {
                    Ok(structure) => {
                        if episode.entities.is_empty() {
                            episode.entities = structure.entities;
                        }
                        if episode.topics.is_empty() {
                            episode.topics = structure.topics;
                        }
                        if episode.emotional_valence == 0.0 && structure.emotional_valence != 0.0 {
                            episode.emotional_valence = structure.emotional_valence;
                        }
                        if episode.emotional_intensity == 0.0 && structure.emotional_intensity != 0.0 {
                            episode.emotional_intensity = structure.emotional_intensity;
                        }
                        if episode.importance_score == 0.5 && structure.importance != 0.5 {
                            episode.importance_score = structure.importance;
                        }
                        if episode.causal_links.is_empty() && !structure.causal_links.is_empty() {
                            self.resolve_causal_links(scope, &mut episode, &structure.causal_links).await;
                        }

                        let update = EpisodeStructureUpdate {
                            entities: episode.entities.clone(),
                            topics: episode.topics.clone(),
                            causal_links: episode.causal_links.clone(),
                            emotional_valence: episode.emotional_valence,
                            emotional_intensity: episode.emotional_intensity,
                            importance_score: episode.importance_score,
                        };
                        if let Err(err) = self.episodes.update_episode_structure(scope, episode.id, &update).await {
                            tracing::warn!(worker = "consolidation", stage = 1, episode_id = %episode.id, error = %err, "failed to persist structural enrichment");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(worker = "consolidation", stage = 1, episode_id = %episode.id, error = %err, "structural extraction failed, skipping enrichment");
                    }
                }
            }

            if let Some(embedding) = episode.embedding.clone() {
                self.create_cross_memory_associations(scope, episode.id, &embedding).await;
            }

            if episode.consolidation_status.can_transition_to(ConsolidationStatus::Processed) {
                self.episodes.update_consolidation_status(scope, episode.id, ConsolidationStatus::Processed).await?;
            }
        }
        Ok(())
    }

    /// Best-effort resolution of LLM-surfaced causal-link descriptions into
    /// ids of other episodes in this agent's history. `engram-episodic`
    /// intentionally defers this (see its `encode` doc) — this is where
    /// that deferred work happens.
    async fn resolve_causal_links(&self, scope: &Scope, episode: &mut engram_core::memory::Episode, descriptions: &[String]) {
        for description in descriptions {
            let embedding = match self.embedder.embed(description).await {
                Ok(e) => e,
                Err(err) => {
                    tracing::debug!(worker = "consolidation", stage = 1, episode_id = %episode.id, error = %err, "causal-link embedding failed, skipping");
                    continue;
                }
            };
            match self.episodes.find_similar(scope, &embedding, self.config.stage1_association_threshold, 1).await {
                Ok(hits) => {
                    if let Some(hit) = hits.into_iter().find(|h| h.episode.id != episode.id) {
                        if !episode.causal_links.contains(&hit.episode.id) {
                            episode.causal_links.push(hit.episode.id);
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(worker = "consolidation", stage = 1, episode_id = %episode.id, error = %err, "causal-link resolution lookup failed");
                }
            }
        }
    }

    /// Thematic cross-memory association to the top semantic beliefs
    /// similar to this episode (spec §4.11 Stage 1: "episodic<->semantic").
    async fn create_cross_memory_associations(&self, scope: &Scope, episode_id: uuid::Uuid, embedding: &[f32]) {
        let similar = match self.memories.find_similar(scope, embedding, self.config.stage1_association_threshold, None).await {
            Ok(hits) => hits,
            Err(err) => {
                tracing::warn!(worker = "consolidation", stage = 1, episode_id = %episode_id, error = %err, "cross-memory similarity lookup failed");
                return;
            }
        };

        for hit in similar {
            let edge = Association::new(
                scope.clone(),
                NodeKind::Episode,
                episode_id,
                NodeKind::Memory,
                hit.memory.id,
                RelationKind::Thematic,
                hit.similarity,
            );
            if let Err(err) = self.graph.create_edge(&edge).await {
                tracing::warn!(worker = "consolidation", stage = 1, episode_id = %episode_id, error = %err, "failed to persist cross-memory association");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engram_core::config::ConsolidationConfig;
    use engram_core::memory::{Episode, Scope};
    use engram_core::traits::EpisodeStore;
    use engram_providers::llm::{ClusterMember, ConversationTurn, SimilarMemorySummary};
    use engram_providers::mock::{MockEmbedder, MockLlm};
    use engram_providers::types::{
        DetectedRelationship, EpisodeStructure, ExtractedBelief, ExtractedEntity, ExtractedProcedure, ImplicitFeedback,
        SchemaPattern, TensionVerdict,
    };
    use engram_providers::Llm;
    use engram_storage::Store;

    use super::super::ConsolidationWorker;

    /// An LLM stub that always returns a fixed, non-empty structural
    /// enrichment, used to drive Stage 1 deterministically. `causal_links`
    /// is configurable per test since resolving one requires a matching
    /// prior episode already in the store.
    struct ScriptedLlm {
        causal_links: Vec<String>,
    }

    impl Llm for ScriptedLlm {
        async fn classify(&self, content: &str) -> engram_core::errors::EngramResult<engram_core::memory::MemoryType> {
            MockLlm::default().classify(content).await
        }
        async fn extract(&self, conversation: &[ConversationTurn]) -> engram_core::errors::EngramResult<Vec<ExtractedBelief>> {
            MockLlm::default().extract(conversation).await
        }
        async fn summarize(&self, memories: &[String]) -> engram_core::errors::EngramResult<String> {
            MockLlm::default().summarize(memories).await
        }
        async fn check_tension(&self, a: &str, b: &str) -> engram_core::errors::EngramResult<TensionVerdict> {
            MockLlm::default().check_tension(a, b).await
        }
        async fn extract_episode_structure(&self, _text: &str) -> engram_core::errors::EngramResult<EpisodeStructure> {
            Ok(EpisodeStructure {
                entities: vec!["alice".to_string()],
                topics: vec!["deploys".to_string()],
                causal_links: self.causal_links.clone(),
                emotional_valence: 0.4,
                emotional_intensity: 0.6,
                importance: 0.9,
            })
        }
        async fn extract_procedure(&self, text: &str) -> engram_core::errors::EngramResult<Option<ExtractedProcedure>> {
            MockLlm::default().extract_procedure(text).await
        }
        async fn detect_schema_pattern(&self, cluster: &[ClusterMember]) -> engram_core::errors::EngramResult<Option<SchemaPattern>> {
            MockLlm::default().detect_schema_pattern(cluster).await
        }
        async fn extract_entities(&self, text: &str) -> engram_core::errors::EngramResult<Vec<ExtractedEntity>> {
            MockLlm::default().extract_entities(text).await
        }
        async fn detect_relationships(
            &self,
            memory_content: &str,
            similar: &[SimilarMemorySummary],
        ) -> engram_core::errors::EngramResult<Vec<DetectedRelationship>> {
            MockLlm::default().detect_relationships(memory_content, similar).await
        }
        async fn detect_implicit_feedback(
            &self,
            memories: &[String],
            conversation: &[ConversationTurn],
        ) -> engram_core::errors::EngramResult<Vec<ImplicitFeedback>> {
            MockLlm::default().detect_implicit_feedback(memories, conversation).await
        }
        async fn detect_outcome(&self, text: &str) -> engram_core::errors::EngramResult<engram_core::memory::Outcome> {
            MockLlm::default().detect_outcome(text).await
        }
    }

    fn scope() -> Scope {
        Scope::new("t1", "agent-1")
    }

    #[tokio::test]
    async fn stage1_persists_structural_enrichment() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = ConsolidationWorker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(ScriptedLlm { causal_links: Vec::new() }),
            Arc::new(MockEmbedder::default()),
            ConsolidationConfig::default(),
            vec!["t1".to_string()],
        );

        let mut episode = Episode::new(scope(), "deployed the service for alice".to_string(), None);
        episode.importance_score = 0.9;
        store.create(&episode).await.unwrap();

        worker.stage1_episode_processing(&scope()).await.unwrap();

        let reloaded = store.get(&scope(), episode.id).await.unwrap().unwrap();
        assert_eq!(reloaded.entities, vec!["alice".to_string()]);
        assert_eq!(reloaded.topics, vec!["deploys".to_string()]);
        assert!((reloaded.emotional_valence - 0.4).abs() < 1e-6);
        assert!((reloaded.emotional_intensity - 0.6).abs() < 1e-6);
        assert!((reloaded.importance_score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stage1_resolves_and_persists_causal_links() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let embedder = Arc::new(MockEmbedder::default());
        let causal_description = "rolled back the broken release".to_string();
        let worker = ConsolidationWorker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(ScriptedLlm { causal_links: vec![causal_description.clone()] }),
            embedder.clone(),
            ConsolidationConfig::default(),
            vec!["t1".to_string()],
        );

        // A prior episode the causal-link description should resolve to.
        let mut prior = Episode::new(scope(), causal_description.clone(), None);
        prior.embedding = Some(embedder.embed(&prior.raw_content).await.unwrap());
        store.create(&prior).await.unwrap();

        let mut episode = Episode::new(scope(), "deployed the service for alice".to_string(), None);
        episode.importance_score = 0.9;
        store.create(&episode).await.unwrap();

        worker.stage1_episode_processing(&scope()).await.unwrap();

        let reloaded = store.get(&scope(), episode.id).await.unwrap().unwrap();
        assert_eq!(reloaded.causal_links, vec![prior.id]);
        assert_eq!(reloaded.entities, vec!["alice".to_string()]);
    }
}
