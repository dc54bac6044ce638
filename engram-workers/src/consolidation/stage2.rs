//! Stage 2 — semantic extraction (spec §4.11).

use engram_core::confidence::MAX_CONF;
use engram_core::errors::EngramResult;
use engram_core::memory::{Association, ConsolidationStatus, Memory, NodeKind, Outcome, Provenance, RelationKind, Scope};
use engram_providers::llm::ConversationTurn;

use super::ConsolidationWorker;

impl ConsolidationWorker {
    pub(super) async fn stage2_semantic_extraction(&self, scope: &Scope) -> EngramResult<()> {
        let episodes = self
            .episodes
            .get_by_consolidation_status(scope, ConsolidationStatus::Processed, self.config.episode_batch_size)
            .await?;

        for episode in episodes {
            let low_value = episode.importance_score < self.config.stage1_min_importance && matches!(episode.outcome, Outcome::Neutral);

            if !low_value {
                let turn = [ConversationTurn {
                    role: "event".to_string(),
                    content: episode.raw_content.clone(),
                }];
                match self.llm.extract(&turn).await {
                    Ok(beliefs) => {
                        for belief in beliefs {
                            if let Err(err) = self.extract_one_belief(scope, episode.id, belief).await {
                                tracing::warn!(worker = "consolidation", stage = 2, episode_id = %episode.id, error = %err, "belief extraction step failed, skipping belief");
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(worker = "consolidation", stage = 2, episode_id = %episode.id, error = %err, "belief extraction failed, skipping episode");
                    }
                }
            }

            if episode.consolidation_status.can_transition_to(ConsolidationStatus::Abstracted) {
                self.episodes.update_consolidation_status(scope, episode.id, ConsolidationStatus::Abstracted).await?;
            }
        }
        Ok(())
    }

    async fn extract_one_belief(
        &self,
        scope: &Scope,
        episode_id: uuid::Uuid,
        belief: engram_providers::types::ExtractedBelief,
    ) -> EngramResult<()> {
        let embedding = match self.embedder.embed(&belief.content).await {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(worker = "consolidation", stage = 2, episode_id = %episode_id, error = %err, "belief embedding failed, skipping belief");
                return Ok(());
            }
        };

        let similar = self
            .memories
            .find_similar(scope, &embedding, self.config.stage2_similarity_threshold, None)
            .await?;

        let memory_id = if let Some(hit) = similar.into_iter().next() {
            let new_confidence = (hit.memory.confidence + self.config.stage2_reinforce_delta).min(MAX_CONF);
            self.memories.update_confidence(scope, hit.memory.id, new_confidence).await?;
            self.memories.update_reinforcement(scope, hit.memory.id, hit.memory.reinforcement_count + 1).await?;
            hit.memory.id
        } else {
            let initial = belief
                .confidence
                .unwrap_or_else(|| belief.evidence_type.map(|e| e.initial_confidence()).unwrap_or(0.5))
                * 0.8;
            let mut memory = Memory::new(scope.clone(), belief.memory_type, belief.content, Provenance::Derived, format!("episode:{episode_id}"));
            memory.embedding = Some(embedding);
            memory.confidence = initial.clamp(engram_core::confidence::MIN_CONF, MAX_CONF);
            self.memories.create(&memory).await?;
            memory.id
        };

        self.episodes.link_derived_memory(scope, episode_id, memory_id).await?;

        let edge = Association::new(scope.clone(), NodeKind::Episode, episode_id, NodeKind::Memory, memory_id, RelationKind::Derived, 1.0);
        if let Err(err) = self.graph.create_edge(&edge).await {
            tracing::warn!(worker = "consolidation", stage = 2, episode_id = %episode_id, error = %err, "failed to persist derived association");
        }

        Ok(())
    }
}
