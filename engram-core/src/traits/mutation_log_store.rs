use crate::errors::EngramResult;
use crate::memory::{MutationLogEntry, Scope};

/// Append-only persistence contract for the mutation log (spec §3/§4.2).
#[allow(async_fn_in_trait)]
pub trait MutationLogStore: Send + Sync {
    async fn append(&self, entry: &MutationLogEntry) -> EngramResult<i64>;
    async fn list_for_source(&self, scope: &Scope, source_id: uuid::Uuid) -> EngramResult<Vec<MutationLogEntry>>;
}
