use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{Procedure, Scope};

#[derive(Debug, Clone)]
pub struct ScoredProcedure {
    pub procedure: Procedure,
    pub similarity: f32,
}

/// Persistence contract for procedural skills (spec §4.2).
#[allow(async_fn_in_trait)]
pub trait ProcedureStore: Send + Sync {
    async fn create(&self, procedure: &Procedure) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Procedure>>;
    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;
    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Procedure>>;

    async fn find_by_trigger_similarity(
        &self,
        scope: &Scope,
        trigger_embedding: &[f32],
        threshold: f32,
    ) -> EngramResult<Vec<ScoredProcedure>>;

    async fn find_by_keywords(
        &self,
        scope: &Scope,
        keywords: &[String],
        top_k: usize,
    ) -> EngramResult<Vec<Procedure>>;

    /// Reinforce an existing procedure: `confidence += delta` (capped),
    /// matching Stage 3's trigger-match reinforcement path (spec §4.11).
    async fn reinforce(&self, scope: &Scope, id: Uuid, delta: f64, cap: f64) -> EngramResult<()>;

    async fn record_use(&self, scope: &Scope, id: Uuid, succeeded: bool) -> EngramResult<()>;
    async fn archive(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;
    async fn apply_decay(&self, scope: &Scope, lambda: f64) -> EngramResult<usize>;
}
