//! Stage 3 — procedural learning (spec §4.11).

use chrono::Utc;

use engram_core::errors::EngramResult;
use engram_core::memory::{Outcome, Scope};
use engram_procedural::{CreateOrReinforceRequest, ProcedureService};

use super::ConsolidationWorker;

impl ConsolidationWorker {
    pub(super) async fn stage3_procedural_learning(&self, scope: &Scope) -> EngramResult<()> {
        let since = Utc::now() - chrono::Duration::days(self.config.stage3_lookback_days);
        let episodes = self
            .episodes
            .recent_by_outcome_since(scope, Outcome::Success, since, self.config.stage3_min_importance)
            .await?;

        let procedures = ProcedureService::new(self.procedures.clone(), self.embedder.clone());

        for episode in episodes {
            if !episode.derived_procedural_ids.is_empty() {
                continue;
            }
            let extracted = match self.llm.extract_procedure(&episode.raw_content).await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(worker = "consolidation", stage = 3, episode_id = %episode.id, error = %err, "procedure extraction failed, skipping episode");
                    continue;
                }
            };

            let procedure_id = match procedures
                .create_or_reinforce(CreateOrReinforceRequest {
                    scope: scope.clone(),
                    trigger_pattern: extracted.trigger_pattern,
                    trigger_keywords: extracted.trigger_keywords,
                    action_template: extracted.action_template,
                    action_type: extracted.action_type,
                    derived_from_episode: Some(episode.id),
                })
                .await
            {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(worker = "consolidation", stage = 3, episode_id = %episode.id, error = %err, "create_or_reinforce failed, skipping episode");
                    continue;
                }
            };

            if let Err(err) = self.episodes.link_derived_procedure(scope, episode.id, procedure_id).await {
                tracing::warn!(worker = "consolidation", stage = 3, episode_id = %episode.id, error = %err, "failed to link derived procedure");
            }
        }
        Ok(())
    }
}
