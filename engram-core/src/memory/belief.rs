use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::confidence::{self, Tier};

use super::Scope;

/// Type of a semantic belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Fact,
    Preference,
    Constraint,
    Decision,
}

impl MemoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Fact => "fact",
            MemoryType::Preference => "preference",
            MemoryType::Constraint => "constraint",
            MemoryType::Decision => "decision",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fact" => Some(MemoryType::Fact),
            "preference" => Some(MemoryType::Preference),
            "constraint" => Some(MemoryType::Constraint),
            "decision" => Some(MemoryType::Decision),
            _ => None,
        }
    }
}

/// Where a belief came from. Feeds source-reliability weighting in the
/// metacognitive service (spec §4.15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    User,
    Tool,
    Agent,
    Derived,
    Inferred,
}

impl Provenance {
    /// Baseline source reliability used by confidence reassessment (§4.15).
    pub fn reliability(self) -> f64 {
        match self {
            Provenance::User => 0.95,
            Provenance::Tool => 0.85,
            Provenance::Derived => 0.75,
            Provenance::Inferred => 0.65,
            Provenance::Agent => 0.7,
        }
    }
}

/// A semantic belief: a time-stable proposition with a confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub scope: Scope,
    pub memory_type: MemoryType,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
    pub confidence: f64,
    pub reinforcement_count: u32,
    pub decay_rate: f32,
    pub provenance: Provenance,
    pub source: String,
    pub last_accessed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub needs_review: bool,
    pub archived: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Memory {
    /// Default decay rate applied when a memory is created without one.
    /// Resolves the spec's open question on `decay_rate=0`: zero is treated
    /// as an explicit, valid rate (no decay), not as "use default" — only
    /// *construction* without a caller-supplied rate uses this default.
    /// See DESIGN.md "Open Questions" for the rationale.
    pub const DEFAULT_DECAY_RATE: f32 = 0.02;

    pub fn new(
        scope: Scope,
        memory_type: MemoryType,
        content: String,
        provenance: Provenance,
        source: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            memory_type,
            content,
            embedding: None,
            confidence: 1.0_f64.clamp(confidence::MIN_CONF, confidence::MAX_CONF),
            reinforcement_count: 0,
            decay_rate: Self::DEFAULT_DECAY_RATE,
            provenance,
            source,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
            needs_review: false,
            archived: false,
            expires_at: None,
        }
    }

    /// Derive the retrieval tier from the current confidence.
    pub fn tier(&self) -> Tier {
        confidence::compute_tier(self.confidence)
    }

    /// Whether confidence has fallen low enough to archive (spec §3).
    pub fn should_archive(&self) -> bool {
        self.confidence < confidence::ARCHIVE_THRESHOLD
    }
}
