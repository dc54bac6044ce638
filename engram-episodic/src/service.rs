use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Association, Episode, NodeKind, RelationKind, Scope};
use engram_core::traits::{EpisodeStore, GraphStore};
use engram_providers::{Embedder, Llm};

/// Similarity threshold above which a prior episode is linked thematically
/// to a newly-encoded one (spec §4.4).
const THEMATIC_LINK_THRESHOLD: f32 = 0.7;
/// How many prior episodes to link per encode (spec §4.4: "up to 5").
const THEMATIC_LINK_LIMIT: usize = 5;
/// Semantic-recall similarity floor (spec §4.4 mode 1).
const SEMANTIC_RECALL_THRESHOLD: f32 = 0.5;

pub struct EncodeEpisodeRequest {
    pub scope: Scope,
    pub raw_content: String,
    pub conversation_id: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Exclusive recall modes (spec §4.4: "exactly one must be present").
pub enum RecallMode {
    Semantic { query: String, top_k: usize },
    TimeRange { start: DateTime<Utc>, end: DateTime<Utc> },
    Importance { min_importance: f32 },
}

/// Episode encoding, recall, and outcome recording (spec §4.4, component C2).
pub struct EpisodeService {
    store: Arc<dyn EpisodeStore>,
    graph_store: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
}

impl EpisodeService {
    pub fn new(
        store: Arc<dyn EpisodeStore>,
        graph_store: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
    ) -> Self {
        Self {
            store,
            graph_store,
            embedder,
            llm,
        }
    }

    pub async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Episode> {
        self.store
            .get(scope, id)
            .await?
            .ok_or_else(|| EngramError::EpisodeNotFound { id: id.to_string() })
    }

    pub async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        self.store.delete(scope, id).await
    }

    /// Encode a raw event into an episode (spec §4.4).
    pub async fn encode(&self, req: EncodeEpisodeRequest) -> EngramResult<Episode> {
        if req.raw_content.trim().is_empty() {
            return Err(EngramError::EpisodeContentEmpty);
        }
        if req.scope.agent_id.trim().is_empty() {
            return Err(EngramError::AgentMissing);
        }

        let mut episode = Episode::new(req.scope.clone(), req.raw_content.clone(), req.occurred_at);
        episode.conversation_id = req.conversation_id;

        episode.embedding = match self.embedder.embed(&req.raw_content).await {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(component = "episodic", agent_id = %req.scope.agent_id, error = %err, "embedding failed, storing without embedding");
                None
            }
        };

        match self.llm.extract_episode_structure(&req.raw_content).await {
            Ok(structure) => {
                episode.entities = structure.entities;
                episode.topics = structure.topics;
                episode.emotional_valence = structure.emotional_valence;
                episode.emotional_intensity = structure.emotional_intensity;
                episode.importance_score = structure.importance;
                if !structure.causal_links.is_empty() {
                    tracing::debug!(
                        component = "episodic",
                        episode_id = %episode.id,
                        count = structure.causal_links.len(),
                        "LLM surfaced causal-link descriptions; resolving to episode ids is left to consolidation"
                    );
                }
            }
            Err(err) => {
                tracing::warn!(component = "episodic", agent_id = %req.scope.agent_id, error = %err, "structural extraction failed");
            }
        }

        self.store.create(&episode).await?;

        if let Some(embedding) = episode.embedding.clone() {
            self.link_similar_episodes(&req.scope, &episode, &embedding).await;
        }

        let hint_turn = [engram_providers::llm::ConversationTurn {
            role: "event".to_string(),
            content: req.raw_content.clone(),
        }];
        match self.llm.extract(&hint_turn).await {
            Ok(beliefs) if !beliefs.is_empty() => {
                tracing::debug!(component = "episodic", episode_id = %episode.id, count = beliefs.len(), "candidate beliefs surfaced; creation deferred to consolidation Stage 2");
            }
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(component = "episodic", episode_id = %episode.id, error = %err, "best-effort belief extraction hint skipped");
            }
        }

        Ok(episode)
    }

    async fn link_similar_episodes(&self, scope: &Scope, episode: &Episode, embedding: &[f32]) {
        let similar = match self
            .store
            .find_similar(scope, embedding, THEMATIC_LINK_THRESHOLD, THEMATIC_LINK_LIMIT)
            .await
        {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(component = "episodic", episode_id = %episode.id, error = %err, "find_similar failed during thematic linking");
                return;
            }
        };

        for candidate in similar {
            if candidate.episode.id == episode.id {
                continue;
            }
            let edge = Association::new(
                scope.clone(),
                NodeKind::Episode,
                episode.id,
                NodeKind::Episode,
                candidate.episode.id,
                RelationKind::Thematic,
                candidate.similarity,
            );
            if let Err(err) = self.graph_store.create_edge(&edge).await {
                tracing::warn!(component = "episodic", episode_id = %episode.id, error = %err, "failed to persist thematic association");
            }
        }
    }

    /// Record the outcome of an episode (spec §4.4 "RecordOutcome"). The
    /// store contract carries outcome only, not a free-text description —
    /// see DESIGN.md.
    pub async fn record_outcome(&self, scope: &Scope, id: Uuid, outcome: &str) -> EngramResult<()> {
        let outcome = engram_core::memory::Outcome::parse(outcome)
            .ok_or_else(|| EngramError::InvalidOutcome { outcome: outcome.to_string() })?;
        self.store.update_outcome(scope, id, outcome).await
    }

    /// Recall over exactly one of the three exclusive modes (spec §4.4).
    pub async fn recall(&self, scope: &Scope, mode: RecallMode) -> EngramResult<Vec<Episode>> {
        let episodes = match mode {
            RecallMode::Semantic { query, top_k } => {
                if query.trim().is_empty() {
                    return Err(EngramError::RecallQueryEmpty);
                }
                let embedding = match self.embedder.embed(&query).await {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::warn!(component = "episodic", agent_id = %scope.agent_id, error = %err, "embedder unavailable, recall degraded to empty");
                        return Ok(Vec::new());
                    }
                };
                self.store
                    .recall_semantic(scope, &embedding, SEMANTIC_RECALL_THRESHOLD, top_k)
                    .await?
                    .into_iter()
                    .map(|s| s.episode)
                    .collect()
            }
            RecallMode::TimeRange { start, end } => self.store.recall_by_time_range(scope, start, end).await?,
            RecallMode::Importance { min_importance } => {
                self.store.recall_by_importance(scope, min_importance).await?
            }
        };

        for episode in &episodes {
            if let Err(err) = self.store.record_access(scope, episode.id).await {
                tracing::warn!(component = "episodic", episode_id = %episode.id, error = %err, "record_access failed");
            }
        }

        Ok(episodes)
    }
}
