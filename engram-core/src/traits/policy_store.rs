use crate::errors::EngramResult;
use crate::memory::{MemoryType, Policy, Scope};

/// Persistence contract for per-type policies (spec §4.2/§4.10).
#[allow(async_fn_in_trait)]
pub trait PolicyStore: Send + Sync {
    async fn upsert(&self, policy: &Policy) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, memory_type: MemoryType) -> EngramResult<Option<Policy>>;
    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Policy>>;
}
