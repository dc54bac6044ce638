use serde::{Deserialize, Serialize};

/// Five-stage consolidation pipeline tuning (spec §4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    pub episode_batch_size: usize,
    pub stage1_min_importance: f32,
    pub stage1_association_threshold: f32,
    pub stage2_similarity_threshold: f32,
    pub stage2_reinforce_delta: f64,
    pub stage3_lookback_days: i64,
    pub stage3_min_importance: f32,
    pub stage3_trigger_similarity: f32,
    pub stage4_min_confidence: f64,
    pub stage4_min_age_hours: i64,
    pub stage4_cluster_similarity: f32,
    pub stage4_min_cluster_size: usize,
    pub stage5_archive_threshold: f64,
    pub stage5_update_epsilon: f64,
    pub stage5_merge_threshold_full_scope: f32,
    pub stage5_merge_reinforce_delta: f64,
    pub procedure_decay_lambda: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            episode_batch_size: 50,
            stage1_min_importance: 0.6,
            stage1_association_threshold: 0.7,
            stage2_similarity_threshold: 0.85,
            stage2_reinforce_delta: 0.05,
            stage3_lookback_days: 7,
            stage3_min_importance: 0.6,
            stage3_trigger_similarity: 0.9,
            stage4_min_confidence: 0.6,
            stage4_min_age_hours: 24,
            stage4_cluster_similarity: 0.65,
            stage4_min_cluster_size: 5,
            stage5_archive_threshold: 0.15,
            stage5_update_epsilon: 0.001,
            stage5_merge_threshold_full_scope: 0.92,
            stage5_merge_reinforce_delta: 0.02,
            procedure_decay_lambda: 0.01,
        }
    }
}
