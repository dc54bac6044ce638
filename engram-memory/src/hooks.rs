use engram_core::errors::EngramResult;
use engram_core::memory::{Memory, Scope};

/// Best-effort graph-building side effect dispatched after a belief create
/// (spec §4.8). Implemented by `engram-graph`; injected here so this crate
/// never depends on the graph-builder's own dependencies (LLM entity
/// extraction, etc). Any failure is logged and swallowed by the caller —
/// this trait's `Err` is never allowed to fail the primary write.
#[allow(async_fn_in_trait)]
pub trait GraphHook: Send + Sync {
    async fn on_memory_created(&self, scope: &Scope, memory: &Memory) -> EngramResult<()>;
}

/// No-op hook used when no graph builder is wired in (e.g. in isolated
/// tests of the memory service).
pub struct NoopGraphHook;

impl GraphHook for NoopGraphHook {
    async fn on_memory_created(&self, _scope: &Scope, _memory: &Memory) -> EngramResult<()> {
        Ok(())
    }
}
