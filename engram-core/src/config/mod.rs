mod consolidation_config;
mod decay_config;
mod retrieval_config;
mod worker_config;
mod working_memory_config;

use serde::{Deserialize, Serialize};

pub use consolidation_config::ConsolidationConfig;
pub use decay_config::DecayConfig;
pub use retrieval_config::RetrievalConfig;
pub use worker_config::WorkerConfig;
pub use working_memory_config::WorkingMemoryConfig;

/// Top-level configuration aggregating all subsystem configs, mirroring
/// the teacher's `CortexConfig` aggregate-of-subsystem-configs shape.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngramConfig {
    pub retrieval: RetrievalConfig,
    pub decay: DecayConfig,
    pub consolidation: ConsolidationConfig,
    pub working_memory: WorkingMemoryConfig,
    pub workers: WorkerConfig,
}

impl EngramConfig {
    /// Load config from a TOML string, falling back to defaults for
    /// missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
