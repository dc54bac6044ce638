use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Procedure, Scope};
use engram_core::traits::ProcedureStore;
use engram_providers::Embedder;

/// Trigger-similarity floor used by working memory's direct activation
/// step for procedural recall (spec §4.9 step 1).
const MATCH_THRESHOLD: f32 = 0.6;
/// Trigger-similarity floor above which Stage 3 reinforces an existing
/// procedure instead of creating a new one (spec §4.11 Stage 3).
const REINFORCEMENT_THRESHOLD: f32 = 0.9;
const REINFORCEMENT_DELTA: f64 = 0.05;
const REINFORCEMENT_CAP: f64 = 0.99;
/// Hourly decay applied to the recency factor used to break ties between
/// equally-similar procedures (spec §4.6's freshness term, reused here —
/// see DESIGN.md).
const RECENCY_DECAY: f64 = 1e-4;

pub struct CreateOrReinforceRequest {
    pub scope: Scope,
    pub trigger_pattern: String,
    pub trigger_keywords: Vec<String>,
    pub action_template: String,
    pub action_type: String,
    pub derived_from_episode: Option<Uuid>,
}

/// Procedural skill matching, recency-weighted selection, and the
/// Stage 3 create-or-reinforce path (spec §4.11 Stage 3, component C3).
pub struct ProcedureService {
    store: Arc<dyn ProcedureStore>,
    embedder: Arc<dyn Embedder>,
}

impl ProcedureService {
    pub fn new(store: Arc<dyn ProcedureStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Procedure> {
        self.store
            .get(scope, id)
            .await?
            .ok_or_else(|| EngramError::ProcedureNotFound { id: id.to_string() })
    }

    pub async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        self.store.delete(scope, id).await
    }

    /// Find procedures whose trigger matches `cue`, ranked by
    /// `similarity · confidence · recency`, most relevant first (spec
    /// §4.9 step 1 consumes the top of this list).
    pub async fn match_trigger(&self, scope: &Scope, cue: &str, top_k: usize) -> EngramResult<Vec<Procedure>> {
        if cue.trim().is_empty() {
            return Err(EngramError::RecallQueryEmpty);
        }
        let embedding = match self.embedder.embed(cue).await {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(component = "procedural", agent_id = %scope.agent_id, error = %err, "embedder unavailable, match degraded to empty");
                return Ok(Vec::new());
            }
        };

        let candidates = self.store.find_by_trigger_similarity(scope, &embedding, MATCH_THRESHOLD).await?;
        let now = Utc::now();

        let mut scored: Vec<(f64, Procedure)> = candidates
            .into_iter()
            .map(|c| {
                let recency = match c.procedure.last_used_at {
                    Some(last) => {
                        let hours = (now - last).num_seconds().max(0) as f64 / 3600.0;
                        (-RECENCY_DECAY * hours).exp()
                    }
                    None => 1.0,
                };
                let score = c.similarity as f64 * c.procedure.confidence * recency;
                (score, c.procedure)
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, p)| p).collect())
    }

    /// Record a use of `id` and apply the resulting success/failure count
    /// update (spec: `Procedure::record_use` invariant maintained by the
    /// store).
    pub async fn record_use(&self, scope: &Scope, id: Uuid, succeeded: bool) -> EngramResult<()> {
        self.store.record_use(scope, id, succeeded).await
    }

    /// Stage 3's create-or-reinforce path (spec §4.11 Stage 3): reinforce
    /// an existing procedure whose trigger is near-identical, else create
    /// a new one at the fixed starting confidence.
    pub async fn create_or_reinforce(&self, req: CreateOrReinforceRequest) -> EngramResult<Uuid> {
        let trigger_embedding = match self.embedder.embed(&req.trigger_pattern).await {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(component = "procedural", agent_id = %req.scope.agent_id, error = %err, "trigger embedding failed");
                None
            }
        };

        if let Some(embedding) = &trigger_embedding {
            let existing = self
                .store
                .find_by_trigger_similarity(&req.scope, embedding, REINFORCEMENT_THRESHOLD)
                .await?;
            if let Some(best) = existing.into_iter().next() {
                self.store
                    .reinforce(&req.scope, best.procedure.id, REINFORCEMENT_DELTA, REINFORCEMENT_CAP)
                    .await?;
                return Ok(best.procedure.id);
            }
        }

        let mut procedure = Procedure::new(
            req.scope.clone(),
            req.trigger_pattern,
            req.trigger_keywords,
            req.action_template,
            req.action_type,
        );
        procedure.trigger_embedding = trigger_embedding;
        if let Some(episode_id) = req.derived_from_episode {
            procedure.derived_from_episodes.push(episode_id);
        }
        self.store.create(&procedure).await?;
        Ok(procedure.id)
    }
}
