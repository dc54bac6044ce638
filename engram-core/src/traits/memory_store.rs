use uuid::Uuid;

use crate::confidence::Tier;
use crate::errors::EngramResult;
use crate::memory::{Memory, MemoryType, Scope};

use super::RecallOptions;

/// A memory paired with the similarity score that produced the hit.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    pub memory: Memory,
    pub similarity: f32,
}

/// Persistence contract for semantic beliefs (spec §4.2).
#[allow(async_fn_in_trait)]
pub trait MemoryStore: Send + Sync {
    async fn create(&self, memory: &Memory) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Memory>>;
    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;

    /// Over-fetch candidates by embedding similarity. MUST return results
    /// in descending similarity after applying `min_confidence` and the
    /// tier include-list (spec §4.2).
    async fn recall(
        &self,
        scope: &Scope,
        embedding: &[f32],
        opts: &RecallOptions,
    ) -> EngramResult<Vec<ScoredMemory>>;

    /// Find memories similar to `embedding` above `threshold`. MUST
    /// exclude the exact-id match when `exclude_id` is provided (spec §4.2).
    async fn find_similar(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        exclude_id: Option<Uuid>,
    ) -> EngramResult<Vec<ScoredMemory>>;

    async fn update_confidence(&self, scope: &Scope, id: Uuid, confidence: f64) -> EngramResult<()>;
    async fn update_reinforcement(
        &self,
        scope: &Scope,
        id: Uuid,
        reinforcement_count: u32,
    ) -> EngramResult<()>;

    /// Bump `last_accessed_at` and add `boost` to confidence via log-odds
    /// (used by recall's async access-boost side effect, spec §4.3 step 4).
    async fn increment_access_and_boost(&self, scope: &Scope, id: Uuid, boost: f64) -> EngramResult<()>;

    async fn list_by_agent_for_decay(&self, scope: &Scope) -> EngramResult<Vec<Memory>>;
    async fn list_oldest_by_type(
        &self,
        scope: &Scope,
        memory_type: MemoryType,
        limit: usize,
    ) -> EngramResult<Vec<Memory>>;
    async fn count_by_type(&self, scope: &Scope, memory_type: MemoryType) -> EngramResult<usize>;

    async fn delete_expired(&self, scope: &Scope) -> EngramResult<usize>;
    async fn delete_by_retention(
        &self,
        scope: &Scope,
        memory_type: MemoryType,
        retention_days: u32,
    ) -> EngramResult<usize>;

    async fn archive(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;
    async fn set_needs_review(&self, scope: &Scope, id: Uuid, needs_review: bool) -> EngramResult<()>;

    async fn get_by_tier(&self, scope: &Scope, tier: Tier) -> EngramResult<Vec<Memory>>;
    async fn tier_counts(&self, scope: &Scope) -> EngramResult<Vec<(Tier, usize)>>;

    async fn list_distinct_agent_ids(&self, tenant_id: &str) -> EngramResult<Vec<String>>;
}
