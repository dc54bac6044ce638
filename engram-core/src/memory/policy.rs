use serde::{Deserialize, Serialize};

use super::{belief::MemoryType, Scope};

/// Minimum allowed priority weight (spec §3).
pub const MIN_PRIORITY_WEIGHT: f64 = 0.1;

/// Per-`(agent_id, memory_type)` retention and ranking policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub scope: Scope,
    pub memory_type: MemoryType,
    pub max_memories: u32,
    pub priority_weight: f64,
    pub auto_summarize: bool,
    pub retention_days: Option<u32>,
}

impl Policy {
    pub fn new(scope: Scope, memory_type: MemoryType) -> Self {
        Self {
            scope,
            memory_type,
            max_memories: 1000,
            priority_weight: 1.0,
            auto_summarize: false,
            retention_days: None,
        }
    }
}
