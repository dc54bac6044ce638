use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{association::NodeKind, Scope};

/// Default number of working-memory slots (spec §3/§4.9).
pub const DEFAULT_MAX_SLOTS: usize = 7;

/// Which activation pathway produced an item (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationSource {
    Direct,
    Goal,
    Schema,
    Temporal,
    Spread,
}

impl ActivationSource {
    /// Fixed boost multiplier applied when composing this source's
    /// sub-activation (spec §4.9, steps 1-5).
    pub fn boost(self) -> f32 {
        match self {
            ActivationSource::Direct => 1.0,
            ActivationSource::Goal => 1.2,
            ActivationSource::Schema => 1.1,
            ActivationSource::Temporal => 0.8,
            ActivationSource::Spread => 0.5,
        }
    }
}

/// One item currently active in working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivatedItem {
    pub node_type: NodeKind,
    pub node_id: Uuid,
    pub activation_level: f32,
    pub confidence: f64,
    pub source: ActivationSource,
    pub cue: String,
    pub slot_position: Option<usize>,
}

impl ActivatedItem {
    /// Composite competition score used to rank items for slot assignment
    /// (spec §4.9 "Compete: sort by activation_level * confidence").
    pub fn competition_score(&self) -> f64 {
        self.activation_level as f64 * self.confidence
    }

    /// Stable dedup key for the merge-by-union rule (spec §4.9 "Merge rule").
    pub fn dedup_key(&self) -> (NodeKind, Uuid) {
        (self.node_type, self.node_id)
    }
}

/// One active working-memory session per `(agent_id, tenant_id)` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingMemorySession {
    pub scope: Scope,
    pub current_goal: Option<String>,
    pub active_context: Vec<String>,
    pub max_slots: usize,
    pub items: Vec<ActivatedItem>,
    pub updated_at: DateTime<Utc>,
}

impl WorkingMemorySession {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            current_goal: None,
            active_context: Vec::new(),
            max_slots: DEFAULT_MAX_SLOTS,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}
