use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{ConsolidationStatus, Episode, Outcome, Scope};

/// An episode paired with the similarity score that produced the hit.
#[derive(Debug, Clone)]
pub struct ScoredEpisode {
    pub episode: Episode,
    pub similarity: f32,
}

/// Fields consolidation Stage 1's best-effort structural enrichment can
/// fill in (spec §4.11 Stage 1: "fill missing entities/topics/causal
/// links/valence/intensity/importance"). `causal_links` replaces the full
/// list — the caller only resolves it when the episode's list was empty
/// to begin with.
#[derive(Debug, Clone)]
pub struct EpisodeStructureUpdate {
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub causal_links: Vec<Uuid>,
    pub emotional_valence: f32,
    pub emotional_intensity: f32,
    pub importance_score: f32,
}

/// Persistence contract for episodic memory (spec §4.2/§4.4).
#[allow(async_fn_in_trait)]
pub trait EpisodeStore: Send + Sync {
    async fn create(&self, episode: &Episode) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Episode>>;
    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;

    async fn find_similar(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngramResult<Vec<ScoredEpisode>>;

    /// Semantic-query recall mode (spec §4.4 mode 1).
    async fn recall_semantic(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> EngramResult<Vec<ScoredEpisode>>;

    /// `[start, end]` time-range recall mode (spec §4.4 mode 2).
    async fn recall_by_time_range(
        &self,
        scope: &Scope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngramResult<Vec<Episode>>;

    /// Minimum-importance recall mode (spec §4.4 mode 3).
    async fn recall_by_importance(
        &self,
        scope: &Scope,
        min_importance: f32,
    ) -> EngramResult<Vec<Episode>>;

    async fn get_unconsolidated(&self, scope: &Scope, limit: usize) -> EngramResult<Vec<Episode>>;
    async fn get_by_consolidation_status(
        &self,
        scope: &Scope,
        status: ConsolidationStatus,
        limit: usize,
    ) -> EngramResult<Vec<Episode>>;
    async fn update_consolidation_status(
        &self,
        scope: &Scope,
        id: Uuid,
        status: ConsolidationStatus,
    ) -> EngramResult<()>;

    /// Persist consolidation Stage 1's structural enrichment (spec §4.11
    /// Stage 1). Additive to spec §4.2's listed mirror set — the spec
    /// names the enrichment but not the store method that lands it; see
    /// DESIGN.md "Episode structure updates".
    async fn update_episode_structure(
        &self,
        scope: &Scope,
        id: Uuid,
        update: &EpisodeStructureUpdate,
    ) -> EngramResult<()>;

    async fn link_derived_memory(&self, scope: &Scope, episode_id: Uuid, memory_id: Uuid) -> EngramResult<()>;
    async fn link_derived_procedure(
        &self,
        scope: &Scope,
        episode_id: Uuid,
        procedure_id: Uuid,
    ) -> EngramResult<()>;

    /// Apply exponential decay to `memory_strength`; archive episodes that
    /// fall below `archive_threshold` (spec §4.12).
    async fn apply_decay(&self, scope: &Scope, archive_threshold: f32) -> EngramResult<usize>;
    async fn get_weak(&self, scope: &Scope, threshold: f32) -> EngramResult<Vec<Episode>>;

    async fn record_access(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;
    async fn update_outcome(&self, scope: &Scope, id: Uuid, outcome: Outcome) -> EngramResult<()>;

    async fn recent_by_outcome_since(
        &self,
        scope: &Scope,
        outcome: Outcome,
        since: DateTime<Utc>,
        min_importance: f32,
    ) -> EngramResult<Vec<Episode>>;
}
