//! Consolidation worker (W2): the five-stage pipeline that turns raw
//! episodes into semantic beliefs, procedures and schemas, and prunes
//! what's left behind (spec §4.11).
//!
//! Stages 1-4 are status-driven (they only ever touch episodes/memories
//! that haven't reached the next stage yet) and are therefore safe to run
//! once per sweep regardless of scope. The spec's "per scope ∈ {recent,
//! full}" qualifier is read here as describing Stage 5 alone: a normal
//! decay/archive pass runs every sweep, and the pairwise cosine-merge
//! step — the only part of the pipeline the spec actually splits by scope
//! — runs as an additional full-scope pass afterwards, rather than
//! running the entire Stage 5 twice and double-decaying memories in one
//! sweep. See DESIGN.md "Consolidation scope".

mod stage1;
mod stage2;
mod stage3;
mod stage4;
mod stage5;

use std::sync::Arc;
use std::time::Duration;

use engram_core::config::ConsolidationConfig;
use engram_core::errors::EngramResult;
use engram_core::memory::Scope;
use engram_core::traits::{EpisodeStore, GraphStore, MemoryStore, ProcedureStore, SchemaStore};
use engram_providers::{Embedder, Llm};

use crate::supervisor::Ticker;

pub struct ConsolidationWorker {
    episodes: Arc<dyn EpisodeStore>,
    memories: Arc<dyn MemoryStore>,
    procedures: Arc<dyn ProcedureStore>,
    schemas: Arc<dyn SchemaStore>,
    graph: Arc<dyn GraphStore>,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
    config: ConsolidationConfig,
    tenants: Vec<String>,
    ticker: Ticker,
}

impl ConsolidationWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        episodes: Arc<dyn EpisodeStore>,
        memories: Arc<dyn MemoryStore>,
        procedures: Arc<dyn ProcedureStore>,
        schemas: Arc<dyn SchemaStore>,
        graph: Arc<dyn GraphStore>,
        llm: Arc<dyn Llm>,
        embedder: Arc<dyn Embedder>,
        config: ConsolidationConfig,
        tenants: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            episodes,
            memories,
            procedures,
            schemas,
            graph,
            llm,
            embedder,
            config,
            tenants,
            ticker: Ticker::new(),
        })
    }

    pub fn start(self: &Arc<Self>, tick: Duration, budget: Duration) {
        let this = self.clone();
        self.ticker.start("consolidation", tick, budget, move || {
            let this = this.clone();
            async move { this.sweep().await }
        });
    }

    pub async fn stop(&self) {
        self.ticker.stop().await;
    }

    pub async fn sweep(&self) {
        for tenant in &self.tenants {
            let agent_ids = match self.memories.list_distinct_agent_ids(tenant).await {
                Ok(ids) => ids,
                Err(err) => {
                    tracing::warn!(worker = "consolidation", tenant, error = %err, "failed to list agents, skipping tenant");
                    continue;
                }
            };
            for agent_id in agent_ids {
                let scope = Scope::new(tenant.clone(), agent_id);
                if let Err(err) = self.run_pipeline(&scope).await {
                    tracing::warn!(worker = "consolidation", agent_id = %scope.agent_id, error = %err, "consolidation pipeline failed for agent, skipping");
                }
            }
        }
    }

    async fn run_pipeline(&self, scope: &Scope) -> EngramResult<()> {
        self.stage1_episode_processing(scope).await?;
        self.stage2_semantic_extraction(scope).await?;
        self.stage3_procedural_learning(scope).await?;
        self.stage4_schema_formation(scope).await?;
        self.stage5_forgetting_and_pruning(scope).await?;
        self.stage5_merge_full_scope(scope).await?;
        Ok(())
    }
}
