use serde::{Deserialize, Serialize};

/// Decay-worker tuning (spec §4.12).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    pub lambda_base: f64,
    pub floor: f64,
    pub competition_weight: f64,
    pub competitor_similarity_threshold: f32,
    pub competitor_cap: usize,
    pub resist_coefficient: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            lambda_base: 0.001,
            floor: 0.1,
            competition_weight: 0.5,
            competitor_similarity_threshold: 0.7,
            competitor_cap: 10,
            resist_coefficient: 0.15,
        }
    }
}
