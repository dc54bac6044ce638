use serde::{Deserialize, Serialize};

/// Background worker tick intervals and per-tick budgets (spec §5/§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub decay_tick_secs: u64,
    pub decay_budget_secs: u64,
    pub expirer_tick_secs: u64,
    pub expirer_budget_secs: u64,
    pub tuner_tick_secs: u64,
    pub tuner_budget_secs: u64,
    pub consolidation_tick_secs: u64,
    pub consolidation_budget_secs: u64,
    pub tuner_min_feedback_count: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            decay_tick_secs: 3600,
            decay_budget_secs: 600,
            expirer_tick_secs: 3600,
            expirer_budget_secs: 30,
            tuner_tick_secs: 3600,
            tuner_budget_secs: 30,
            consolidation_tick_secs: 6 * 3600,
            consolidation_budget_secs: 30 * 60,
            tuner_min_feedback_count: 10,
        }
    }
}
