use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use engram_core::config::WorkingMemoryConfig;
use engram_core::errors::EngramResult;
use engram_core::memory::{ActivatedItem, NodeKind, Scope, WorkingMemorySession};
use engram_core::traits::{EpisodeStore, GraphStore, MemoryStore, ProcedureStore, SchemaStore, WorkingMemoryStore};
use engram_providers::Embedder;

/// One activation request: the cues driving direct recall, an optional
/// current goal, and free-text context for schema matching (spec §4.9).
#[derive(Debug, Clone, Default)]
pub struct ActivateRequest {
    pub scope: Scope,
    pub cues: Vec<String>,
    pub goal: Option<String>,
    pub context: Vec<String>,
}

impl ActivateRequest {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            cues: Vec::new(),
            goal: None,
            context: Vec::new(),
        }
    }
}

/// Five-source spreading-activation pipeline, slot competition, and
/// session persistence (spec §4.9, component C9).
pub struct WorkingMemoryService {
    pub(crate) memories: Arc<dyn MemoryStore>,
    pub(crate) episodes: Arc<dyn EpisodeStore>,
    pub(crate) procedures: Arc<dyn ProcedureStore>,
    pub(crate) schemas: Arc<dyn SchemaStore>,
    pub(crate) graph: Arc<dyn GraphStore>,
    pub(crate) sessions: Arc<dyn WorkingMemoryStore>,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) config: WorkingMemoryConfig,
}

impl WorkingMemoryService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        episodes: Arc<dyn EpisodeStore>,
        procedures: Arc<dyn ProcedureStore>,
        schemas: Arc<dyn SchemaStore>,
        graph: Arc<dyn GraphStore>,
        sessions: Arc<dyn WorkingMemoryStore>,
        embedder: Arc<dyn Embedder>,
        config: WorkingMemoryConfig,
    ) -> Self {
        Self {
            memories,
            episodes,
            procedures,
            schemas,
            graph,
            sessions,
            embedder,
            config,
        }
    }

    pub async fn get(&self, scope: &Scope) -> EngramResult<Option<WorkingMemorySession>> {
        self.sessions.get(scope).await
    }

    /// Run the full activation pipeline and persist the resulting session,
    /// overwriting any prior one for this scope (spec §4.9).
    pub async fn activate(&self, req: ActivateRequest) -> EngramResult<WorkingMemorySession> {
        let mut items: HashMap<(NodeKind, Uuid), ActivatedItem> = HashMap::new();

        self.direct(&req, &mut items).await;
        self.goal(&req, &mut items).await;
        self.schema(&req, &mut items).await;
        self.temporal(&req, &mut items).await;
        self.spread(&req, &mut items).await;

        let mut competed: Vec<ActivatedItem> = items.into_values().collect();
        competed.sort_by(|a, b| b.competition_score().partial_cmp(&a.competition_score()).unwrap_or(std::cmp::Ordering::Equal));
        competed.truncate(self.config.max_slots);
        for (position, item) in competed.iter_mut().enumerate() {
            item.slot_position = Some(position);
        }

        let session = WorkingMemorySession {
            scope: req.scope.clone(),
            current_goal: req.goal.clone(),
            active_context: req.context.clone(),
            max_slots: self.config.max_slots,
            items: competed,
            updated_at: Utc::now(),
        };

        self.sessions.persist(&session).await?;
        Ok(session)
    }

    /// Merge one candidate into the working set, keeping the higher
    /// activation on a collision (spec §4.9 "Merge rule").
    pub(crate) fn merge(items: &mut HashMap<(NodeKind, Uuid), ActivatedItem>, candidate: ActivatedItem) {
        items
            .entry(candidate.dedup_key())
            .and_modify(|existing| {
                if candidate.activation_level > existing.activation_level {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }
}
