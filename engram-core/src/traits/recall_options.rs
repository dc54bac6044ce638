use crate::confidence::Tier;
use crate::memory::MemoryType;

/// Whether recall ranks by the weighted scorer or returns raw
/// similarity order (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    Weighted,
    Similarity,
}

/// Inputs to [`crate::traits::MemoryStore::recall`] and the memory
/// service's recall operation (spec §4.3).
#[derive(Debug, Clone)]
pub struct RecallOptions {
    pub top_k: usize,
    pub min_confidence: f64,
    pub memory_type: Option<MemoryType>,
    pub scoring: ScoringMode,
    pub include_tiers: Vec<Tier>,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_confidence: 0.6,
            memory_type: None,
            scoring: ScoringMode::Weighted,
            include_tiers: vec![Tier::Hot, Tier::Warm],
        }
    }
}
