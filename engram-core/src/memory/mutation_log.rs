use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// Append-only record of every confidence/reinforcement change (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationLogEntry {
    /// Monotonic sequence within the store, used for stable ordering.
    pub seq: i64,
    pub scope: Scope,
    pub source_type: String,
    pub source_id: Uuid,
    pub old_confidence: f64,
    pub new_confidence: f64,
    pub old_reinforcement_count: i64,
    pub new_reinforcement_count: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl MutationLogEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        scope: Scope,
        source_type: impl Into<String>,
        source_id: Uuid,
        old_confidence: f64,
        new_confidence: f64,
        old_reinforcement_count: i64,
        new_reinforcement_count: i64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            seq: 0,
            scope,
            source_type: source_type.into(),
            source_id,
            old_confidence,
            new_confidence,
            old_reinforcement_count,
            new_reinforcement_count,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }
}
