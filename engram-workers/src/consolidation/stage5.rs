//! Stage 5 — forgetting & pruning (spec §4.11).
//!
//! Runs every sweep. The scope-split the spec describes ("per scope ∈
//! {recent, full}") is read here as applying only to the pairwise
//! cosine-merge step — see the module doc on `consolidation::mod` for why.

use engram_core::confidence::MAX_CONF;
use engram_core::errors::EngramResult;
use engram_core::memory::Scope;
use engram_core::vector::cosine_similarity;

use super::ConsolidationWorker;

impl ConsolidationWorker {
    pub(super) async fn stage5_forgetting_and_pruning(&self, scope: &Scope) -> EngramResult<()> {
        self.decay_and_prune_memories(scope).await?;
        self.prune_procedures(scope).await?;
        Ok(())
    }

    async fn decay_and_prune_memories(&self, scope: &Scope) -> EngramResult<()> {
        let now = chrono::Utc::now();
        let memories = self.memories.list_by_agent_for_decay(scope).await?;

        for memory in memories {
            let hours_since = (now - memory.last_accessed_at).num_seconds().max(0) as f64 / 3600.0;
            let days = hours_since / 24.0;
            let mut decay = (-(memory.decay_rate as f64) * days).exp();

            if memory.reinforcement_count > 1 {
                let damp = ((memory.reinforcement_count as f64 + 1.0).ln()).recip();
                decay = decay.powf(damp);
            }

            let c_new = (memory.confidence * decay).max(0.1);

            if c_new < self.config.stage5_archive_threshold {
                self.memories.archive(scope, memory.id).await?;
            } else if (c_new - memory.confidence).abs() > self.config.stage5_update_epsilon {
                self.memories.update_confidence(scope, memory.id, c_new).await?;
            }
        }
        Ok(())
    }

    async fn prune_procedures(&self, scope: &Scope) -> EngramResult<()> {
        let procedures = self.procedures.list_by_agent(scope).await?;
        let mut any_survives = false;

        for procedure in &procedures {
            if procedure.archived {
                continue;
            }
            if procedure.should_archive() {
                self.procedures.archive(scope, procedure.id).await?;
            } else {
                any_survives = true;
            }
        }

        if any_survives {
            self.procedures.apply_decay(scope, self.config.procedure_decay_lambda).await?;
        }
        Ok(())
    }

    /// Full-scope-only pairwise cosine merge: any pair of (still-live)
    /// memories at or above `stage5_merge_threshold_full_scope` collapses
    /// into the higher-confidence one, which is reinforced; the other is
    /// archived (spec §4.11 Stage 5 "In full scope, additionally merge...").
    pub(super) async fn stage5_merge_full_scope(&self, scope: &Scope) -> EngramResult<()> {
        let memories = self.memories.list_by_agent_for_decay(scope).await?;
        let mut archived = vec![false; memories.len()];

        for i in 0..memories.len() {
            if archived[i] {
                continue;
            }
            let Some(embedding_i) = memories[i].embedding.as_deref() else { continue };

            for j in (i + 1)..memories.len() {
                if archived[j] {
                    continue;
                }
                let Some(embedding_j) = memories[j].embedding.as_deref() else { continue };

                if cosine_similarity(embedding_i, embedding_j) < self.config.stage5_merge_threshold_full_scope {
                    continue;
                }

                let (keep, drop) = if memories[i].confidence >= memories[j].confidence { (i, j) } else { (j, i) };
                let boosted = (memories[keep].confidence + self.config.stage5_merge_reinforce_delta).min(MAX_CONF);
                self.memories.update_confidence(scope, memories[keep].id, boosted).await?;
                self.memories
                    .update_reinforcement(scope, memories[keep].id, memories[keep].reinforcement_count + 1)
                    .await?;
                self.memories.archive(scope, memories[drop].id).await?;
                archived[drop] = true;

                if drop == i {
                    break;
                }
            }
        }
        Ok(())
    }
}
