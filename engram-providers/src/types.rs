use serde::{Deserialize, Serialize};

use engram_core::memory::MemoryType;

/// Verdict returned by [`crate::Llm::check_tension`] describing the
/// conflict, if any, between two beliefs (spec §4.3 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionKind {
    None,
    Soft,
    Hard,
    Temporal,
    Contextual,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TensionVerdict {
    pub kind: TensionKind,
    pub score: f64,
}

/// Where a belief extracted in consolidation Stage 2 came from, used to
/// pick its initial confidence when the LLM doesn't supply one directly
/// (spec §4.11 Stage 2: "evidence_type.initial_confidence").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    Observed,
    Reported,
    Inferred,
}

impl EvidenceType {
    pub fn initial_confidence(self) -> f64 {
        match self {
            EvidenceType::Observed => 0.8,
            EvidenceType::Reported => 0.65,
            EvidenceType::Inferred => 0.5,
        }
    }
}

/// One belief candidate extracted from a conversation or episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedBelief {
    pub memory_type: MemoryType,
    pub content: String,
    pub confidence: Option<f64>,
    pub evidence_type: Option<EvidenceType>,
}

/// Structural extraction result for one episode (spec §4.4/§4.11 Stage 1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EpisodeStructure {
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub causal_links: Vec<String>,
    pub emotional_valence: f32,
    pub emotional_intensity: f32,
    pub importance: f32,
}

/// A candidate procedure extracted from a successful episode (spec §4.11
/// Stage 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedProcedure {
    pub trigger_pattern: String,
    pub trigger_keywords: Vec<String>,
    pub action_template: String,
    pub action_type: String,
}

/// A candidate schema pattern over a cluster of memories (spec §4.11
/// Stage 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaPattern {
    pub schema_type: String,
    pub name: String,
    pub description: String,
    pub applicable_contexts: Vec<String>,
}

/// An entity mention extracted from a memory's content (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: String,
    pub role: String,
}

/// A typed relationship detected between a memory and a similar one
/// (spec §4.8 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedRelationKind {
    Causal,
    Contradicts,
    Thematic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedRelationship {
    pub target_index: usize,
    pub relation: DetectedRelationKind,
    pub strength: f32,
}

/// LLM-inferred feedback signal from conversation context (spec §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitFeedback {
    pub memory_index: usize,
    pub signal: engram_core::memory::FeedbackSignal,
    pub detector_confidence: f64,
}
