use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use engram_core::config::RetrievalConfig;
use engram_core::confidence::{apply_log_odds, MAX_CONF};
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{
    Association, Memory, MemoryType, MutationLogEntry, NodeKind, Provenance, RelationKind, Scope,
};
use engram_core::traits::{GraphStore, MemoryStore, MutationLogStore, RecallOptions};
use engram_providers::llm::ConversationTurn;
use engram_providers::types::TensionKind;
use engram_providers::{Embedder, Llm};

use engram_policy::PolicyService;

use crate::hooks::GraphHook;
use engram_retrieval::scorer;

/// Confidence a memory is demoted to when a hard contradiction is found
/// against it (spec §4.3 step 4).
const CONTRADICTION_PENALTY: f64 = 0.2;
/// Floor applied to a contradiction-demoted memory. Distinct from the
/// global `MIN_CONF` — this is the spec's own named constant for this path.
const CONTRADICTION_FLOOR: f64 = 0.1;
/// Fixed confidence assigned to a newly created memory that contradicts an
/// existing one (spec §4.3 step 4).
const NEW_CONTRADICTING_CONF: f64 = 0.7;
/// Reinforcement bump applied when an incoming belief matches an existing
/// one with no meaningful tension (spec §4.3 step 4).
const REINFORCE_DELTA: f64 = 0.05;
/// Access-boost applied on recall hits, expressed as a log-odds delta
/// (spec §4.3 step 4).
const DEFAULT_ACCESS_BOOST: f64 = 0.02;
/// Number of reconciliation candidates considered per create (spec §4.3
/// step 4 names a threshold but not a count; bounded here to keep the LLM
/// tension-check fan-out small — see DESIGN.md).
const RECONCILIATION_CANDIDATES: usize = 5;

pub struct CreateMemoryRequest {
    pub scope: Scope,
    pub memory_type: Option<MemoryType>,
    pub content: String,
    pub confidence: Option<f64>,
    pub provenance: Provenance,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct CreateMemoryOutcome {
    pub id: Uuid,
    pub confidence: f64,
    pub reinforced: bool,
}

/// Belief ingestion and tiered recall (spec §4.3, component C1).
pub struct MemoryService {
    store: Arc<dyn MemoryStore>,
    graph_store: Arc<dyn GraphStore>,
    mutation_log: Arc<dyn MutationLogStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Llm>,
    policy: Arc<PolicyService>,
    graph_hook: Arc<dyn GraphHook>,
    config: RetrievalConfig,
}

impl MemoryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn MemoryStore>,
        graph_store: Arc<dyn GraphStore>,
        mutation_log: Arc<dyn MutationLogStore>,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn Llm>,
        policy: Arc<PolicyService>,
        graph_hook: Arc<dyn GraphHook>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            graph_store,
            mutation_log,
            embedder,
            llm,
            policy,
            graph_hook,
            config,
        }
    }

    pub async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Memory> {
        self.store
            .get(scope, id)
            .await?
            .ok_or_else(|| EngramError::MemoryNotFound { id: id.to_string() })
    }

    pub async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        self.store.delete(scope, id).await
    }

    /// Belief ingestion (spec §4.3 "Create contract").
    pub async fn create(&self, req: CreateMemoryRequest) -> EngramResult<CreateMemoryOutcome> {
        if req.content.trim().is_empty() {
            return Err(EngramError::ContentEmpty);
        }
        if req.scope.agent_id.trim().is_empty() {
            return Err(EngramError::AgentMissing);
        }

        let memory_type = match req.memory_type {
            Some(t) => t,
            None => self.llm.classify(&req.content).await.unwrap_or(MemoryType::Fact),
        };

        let mut memory = Memory::new(
            req.scope.clone(),
            memory_type,
            req.content.clone(),
            req.provenance,
            req.source,
        );
        memory.confidence = req.confidence.unwrap_or(1.0).clamp(engram_core::confidence::MIN_CONF, MAX_CONF);

        memory.embedding = match self.embedder.embed(&req.content).await {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(component = "memory", agent_id = %req.scope.agent_id, error = %err, "embedding failed, storing without embedding");
                None
            }
        };

        if let Some(embedding) = memory.embedding.clone() {
            if let Some(outcome) = self.reconcile(&req.scope, &memory, &embedding).await? {
                return Ok(outcome);
            }
        }

        self.store.create(&memory).await?;

        if let Err(err) = self.policy.enforce_on_create(&req.scope, memory_type).await {
            tracing::warn!(component = "memory", agent_id = %req.scope.agent_id, error = %err, "policy enforcement failed");
        }
        if let Err(err) = self.graph_hook.on_memory_created(&req.scope, &memory).await {
            tracing::warn!(component = "memory", agent_id = %req.scope.agent_id, error = %err, "graph builder hook failed");
        }

        Ok(CreateMemoryOutcome {
            id: memory.id,
            confidence: memory.confidence,
            reinforced: false,
        })
    }

    /// Belief reconciliation (spec §4.3 step 4). Returns `Some` when an
    /// existing candidate's tension verdict fully handles the write
    /// (reinforcement or hard contradiction), in which case the caller
    /// must not insert `memory`.
    async fn reconcile(
        &self,
        scope: &Scope,
        memory: &Memory,
        embedding: &[f32],
    ) -> EngramResult<Option<CreateMemoryOutcome>> {
        let candidates = self
            .store
            .find_similar(scope, embedding, self.config.belief_reconciliation_threshold as f32, None)
            .await?;

        for candidate in candidates.into_iter().take(RECONCILIATION_CANDIDATES) {
            let existing = candidate.memory;
            let verdict = match self.llm.check_tension(&existing.content, &memory.content).await {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(component = "memory", agent_id = %scope.agent_id, error = %err, "tension check failed, treating as no tension");
                    continue;
                }
            };

            match verdict.kind {
                TensionKind::Hard if verdict.score > 0.7 => {
                    let demoted = (existing.confidence - CONTRADICTION_PENALTY).max(CONTRADICTION_FLOOR);
                    self.store.update_confidence(scope, existing.id, demoted).await?;

                    let mut new_memory = memory.clone();
                    new_memory.confidence = NEW_CONTRADICTING_CONF;
                    self.store.create(&new_memory).await?;

                    let edge = Association::new(
                        scope.clone(),
                        NodeKind::Memory,
                        new_memory.id,
                        NodeKind::Memory,
                        existing.id,
                        RelationKind::Contradicts,
                        verdict.score as f32,
                    );
                    self.graph_store.create_edge(&edge).await?;

                    return Ok(Some(CreateMemoryOutcome {
                        id: new_memory.id,
                        confidence: new_memory.confidence,
                        reinforced: false,
                    }));
                }
                TensionKind::Temporal => {
                    self.store.archive(scope, existing.id).await?;
                }
                TensionKind::Contextual => {}
                TensionKind::Soft if verdict.score >= 0.3 => {}
                // None, low-tension soft, or a hard verdict that didn't
                // clear the 0.7 threshold: treat as reinforcement (spec
                // §4.3 step 4 "none or low-tension soft").
                _ => {
                    let new_confidence = (existing.confidence + REINFORCE_DELTA).min(MAX_CONF);
                    let new_count = existing.reinforcement_count + 1;
                    self.store.update_confidence(scope, existing.id, new_confidence).await?;
                    self.store.update_reinforcement(scope, existing.id, new_count).await?;

                    let entry = MutationLogEntry::new(
                        scope.clone(),
                        "memory",
                        existing.id,
                        existing.confidence,
                        new_confidence,
                        existing.reinforcement_count as i64,
                        new_count as i64,
                        "reinforced",
                    );
                    self.mutation_log.append(&entry).await?;

                    return Ok(Some(CreateMemoryOutcome {
                        id: existing.id,
                        confidence: new_confidence,
                        reinforced: true,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Belief recall (spec §4.3 "Recall contract").
    pub async fn recall(&self, scope: &Scope, query: &str, opts: &RecallOptions) -> EngramResult<Vec<Memory>> {
        if query.trim().is_empty() {
            return Err(EngramError::RecallQueryEmpty);
        }
        let embedding = match self.embedder.embed(query).await {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(component = "memory", agent_id = %scope.agent_id, error = %err, "embedder unavailable, recall degraded to empty");
                return Ok(Vec::new());
            }
        };

        let over_fetch = (self.config.over_fetch_multiplier * opts.top_k).max(self.config.over_fetch_floor);
        let mut fetch_opts = opts.clone();
        fetch_opts.top_k = over_fetch;

        let candidates = self.store.recall(scope, &embedding, &fetch_opts).await?;

        let filtered: Vec<_> = candidates
            .into_iter()
            .filter(|c| c.similarity as f64 >= c.memory.tier().retrieval_threshold())
            .collect();

        let ranked = match opts.scoring {
            engram_core::traits::ScoringMode::Weighted => {
                let weights = self.policy.get_type_weights(scope).await.unwrap_or_default();
                scorer::rank(filtered, &weights, self.config.freshness_decay, opts.top_k, Utc::now())
            }
            engram_core::traits::ScoringMode::Similarity => {
                let mut filtered = filtered;
                filtered.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
                filtered.truncate(opts.top_k);
                filtered.into_iter().map(|c| c.memory).collect()
            }
        };

        for memory in &ranked {
            if let Err(err) = self
                .store
                .increment_access_and_boost(scope, memory.id, DEFAULT_ACCESS_BOOST)
                .await
            {
                tracing::warn!(component = "memory", agent_id = %scope.agent_id, memory_id = %memory.id, error = %err, "access boost failed");
            }
            if memory.tier().summarize_on_access() {
                tracing::debug!(component = "memory", memory_id = %memory.id, "cold-tier hit, summarization hint emitted");
            }
        }

        Ok(ranked)
    }

    /// Extraction fast path used by episode encoding's best-effort belief
    /// hint (spec §4.4); not the consolidation Stage 2 batch path.
    pub async fn classify_conversation(&self, turns: &[ConversationTurn]) -> EngramResult<Vec<engram_providers::types::ExtractedBelief>> {
        self.llm.extract(turns).await
    }
}
