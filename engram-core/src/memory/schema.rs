use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// Minimum evidence count required to create a schema (spec §3).
pub const SCHEMA_MIN_EVIDENCE: usize = 5;
/// Maximum confidence a schema can hold (spec §3).
pub const SCHEMA_MAX_CONF: f64 = 0.95;

/// An abstracted pattern over >= `SCHEMA_MIN_EVIDENCE` pieces of evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub id: Uuid,
    pub scope: Scope,
    pub schema_type: String,
    pub name: String,
    pub description: String,
    pub attributes: HashMap<String, String>,
    pub applicable_contexts: Vec<String>,
    pub evidence_memories: Vec<Uuid>,
    pub evidence_episodes: Vec<Uuid>,
    pub evidence_count: usize,
    pub confidence: f64,
    pub contradiction_count: u32,
    pub last_validated_at: Option<DateTime<Utc>>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schema {
    pub fn new(
        scope: Scope,
        schema_type: String,
        name: String,
        description: String,
        evidence_memories: Vec<Uuid>,
        evidence_episodes: Vec<Uuid>,
        confidence: f64,
    ) -> Self {
        let now = Utc::now();
        let evidence_count = evidence_memories.len() + evidence_episodes.len();
        Self {
            id: Uuid::new_v4(),
            scope,
            schema_type,
            name,
            description,
            attributes: HashMap::new(),
            applicable_contexts: Vec::new(),
            evidence_memories,
            evidence_episodes,
            evidence_count,
            confidence: confidence.min(SCHEMA_MAX_CONF),
            contradiction_count: 0,
            last_validated_at: None,
            embedding: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a contradiction: confidence is monotone-decreasing on
    /// contradiction (spec §3 invariant).
    pub fn record_contradiction(&mut self, penalty: f64) {
        self.contradiction_count += 1;
        self.confidence = (self.confidence - penalty).max(crate::confidence::MIN_CONF);
        self.updated_at = Utc::now();
    }
}
