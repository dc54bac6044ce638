use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{Schema, Scope};

/// Persistence contract for schemas (spec §4.2).
#[allow(async_fn_in_trait)]
pub trait SchemaStore: Send + Sync {
    async fn create(&self, schema: &Schema) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Schema>>;
    async fn get_by_name(
        &self,
        scope: &Scope,
        schema_type: &str,
        name: &str,
    ) -> EngramResult<Option<Schema>>;
    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Schema>>;

    async fn add_evidence(
        &self,
        scope: &Scope,
        id: Uuid,
        memory_ids: &[Uuid],
        episode_ids: &[Uuid],
    ) -> EngramResult<()>;

    async fn record_contradiction(&self, scope: &Scope, id: Uuid, penalty: f64) -> EngramResult<()>;
    async fn update_confidence(&self, scope: &Scope, id: Uuid, confidence: f64) -> EngramResult<()>;
    async fn record_validation(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;
}
