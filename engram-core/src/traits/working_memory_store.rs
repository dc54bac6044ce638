use crate::errors::EngramResult;
use crate::memory::{Scope, WorkingMemorySession};

/// Persistence contract for working-memory sessions (spec §3/§4.2/§4.9).
/// At most one session per `(agent_id, tenant_id)`; `persist` overwrites
/// any prior rows for the scope.
#[allow(async_fn_in_trait)]
pub trait WorkingMemoryStore: Send + Sync {
    async fn get(&self, scope: &Scope) -> EngramResult<Option<WorkingMemorySession>>;
    async fn persist(&self, session: &WorkingMemorySession) -> EngramResult<()>;
}
