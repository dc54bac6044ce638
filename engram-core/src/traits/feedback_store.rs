use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{Feedback, MemoryType, Scope};

/// Per-`(agent, memory_type)` rollup of feedback signal rates, consumed by
/// the tuner worker (spec §4.14).
#[derive(Debug, Clone)]
pub struct FeedbackAggregate {
    pub memory_type: MemoryType,
    pub total: u64,
    pub used: u64,
    pub ignored: u64,
    pub helpful: u64,
    pub unhelpful: u64,
    pub contradicted: u64,
    pub outdated: u64,
}

impl FeedbackAggregate {
    pub fn ignored_rate(&self) -> f64 {
        rate(self.ignored, self.total)
    }
    pub fn helpful_rate(&self) -> f64 {
        rate(self.helpful, self.total)
    }
    pub fn unhelpful_rate(&self) -> f64 {
        rate(self.unhelpful, self.total)
    }
}

fn rate(n: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 / total as f64
    }
}

/// Persistence contract for feedback events (spec §4.2/§4.5).
#[allow(async_fn_in_trait)]
pub trait FeedbackStore: Send + Sync {
    async fn create(&self, feedback: &Feedback) -> EngramResult<()>;
    async fn count_by_agent(&self, scope: &Scope) -> EngramResult<u64>;
    async fn aggregates_by_agent_id(&self, scope: &Scope) -> EngramResult<Vec<FeedbackAggregate>>;
    async fn list_for_memory(&self, scope: &Scope, memory_id: Uuid) -> EngramResult<Vec<Feedback>>;
}
