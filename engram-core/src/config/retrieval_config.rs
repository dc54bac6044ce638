use serde::{Deserialize, Serialize};

/// Recall and hybrid-retrieval tuning (spec §4.3/§4.6/§4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub default_min_confidence: f64,
    /// `FRESHNESS_DECAY` in the scorer's `exp(-FRESHNESS_DECAY * hours)` term.
    pub freshness_decay: f64,
    pub over_fetch_multiplier: usize,
    pub over_fetch_floor: usize,
    pub default_vector_weight: f64,
    pub default_graph_weight: f64,
    pub default_max_hops: usize,
    pub hop_decay: f64,
    pub belief_reconciliation_threshold: f64,
    pub access_boost: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            default_min_confidence: 0.6,
            freshness_decay: 1e-4,
            over_fetch_multiplier: 3,
            over_fetch_floor: 30,
            default_vector_weight: 0.6,
            default_graph_weight: 0.4,
            default_max_hops: 2,
            hop_decay: 0.7,
            belief_reconciliation_threshold: 0.85,
            access_boost: 0.02,
        }
    }
}
