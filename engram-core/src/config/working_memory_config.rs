use serde::{Deserialize, Serialize};

/// Working-memory activation pipeline tuning (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingMemoryConfig {
    pub max_slots: usize,
    pub direct_semantic_top_k: usize,
    pub direct_semantic_min: f32,
    pub direct_episodic_top_k: usize,
    pub direct_episodic_min: f32,
    pub direct_procedural_top_k: usize,
    pub direct_procedural_min: f32,
    pub schema_top_k: usize,
    pub schema_min_match_score: f32,
    pub temporal_lookback_hours: i64,
    pub temporal_recency_decay_per_hour: f32,
    pub temporal_floor: f32,
    pub spread_decay_per_hop: f32,
    pub spread_max_depth: usize,
    pub spread_floor: f32,
}

impl Default for WorkingMemoryConfig {
    fn default() -> Self {
        Self {
            max_slots: 7, // spec §3: max_slots=7
            direct_semantic_top_k: 10,
            direct_semantic_min: 0.1,
            direct_episodic_top_k: 5,
            direct_episodic_min: 0.5,
            direct_procedural_top_k: 5,
            direct_procedural_min: 0.6,
            schema_top_k: 3,
            schema_min_match_score: 0.3,
            temporal_lookback_hours: 24,
            temporal_recency_decay_per_hour: 0.1,
            temporal_floor: 0.1,
            spread_decay_per_hop: 0.5,
            spread_max_depth: 2,
            spread_floor: 0.1,
        }
    }
}
