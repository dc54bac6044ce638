//! Tuner worker (W4): adjusts per-type policy from feedback aggregates
//! (spec §4.14).

use std::sync::Arc;
use std::time::Duration;

use engram_core::config::WorkerConfig;
use engram_core::errors::EngramResult;
use engram_core::memory::{Policy, Scope, MIN_PRIORITY_WEIGHT};
use engram_core::traits::{FeedbackAggregate, FeedbackStore, MemoryStore, PolicyStore};

use crate::supervisor::Ticker;

/// `max_memories` is never tuned below this floor (spec §4.14).
const MIN_MAX_MEMORIES: u32 = 10;
/// `priority_weight` adjustment applied per closed rule (spec §4.14).
const PRIORITY_WEIGHT_STEP: f64 = 0.1;
/// `max_memories` adjustment applied per closed rule (spec §4.14).
const MAX_MEMORIES_STEP: u32 = 10;
/// Rate threshold above which a tuning rule fires (spec §4.14).
const RATE_THRESHOLD: f64 = 0.7;

pub struct TunerWorker {
    memories: Arc<dyn MemoryStore>,
    feedback: Arc<dyn FeedbackStore>,
    policies: Arc<dyn PolicyStore>,
    config: WorkerConfig,
    tenants: Vec<String>,
    ticker: Ticker,
}

impl TunerWorker {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        feedback: Arc<dyn FeedbackStore>,
        policies: Arc<dyn PolicyStore>,
        config: WorkerConfig,
        tenants: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            memories,
            feedback,
            policies,
            config,
            tenants,
            ticker: Ticker::new(),
        })
    }

    pub fn start(self: &Arc<Self>, tick: Duration, budget: Duration) {
        let this = self.clone();
        self.ticker.start("tuner", tick, budget, move || {
            let this = this.clone();
            async move { this.sweep().await }
        });
    }

    pub async fn stop(&self) {
        self.ticker.stop().await;
    }

    pub async fn sweep(&self) {
        for tenant in &self.tenants {
            let agent_ids = match self.memories.list_distinct_agent_ids(tenant).await {
                Ok(ids) => ids,
                Err(err) => {
                    tracing::warn!(worker = "tuner", tenant, error = %err, "failed to list agents, skipping tenant");
                    continue;
                }
            };
            for agent_id in agent_ids {
                let scope = Scope::new(tenant.clone(), agent_id);
                if let Err(err) = self.tune_agent(&scope).await {
                    tracing::warn!(worker = "tuner", agent_id = %scope.agent_id, error = %err, "tuning failed for agent, skipping");
                }
            }
        }
    }

    async fn tune_agent(&self, scope: &Scope) -> EngramResult<()> {
        let total = self.feedback.count_by_agent(scope).await?;
        if total < self.config.tuner_min_feedback_count as u64 {
            return Ok(());
        }

        for aggregate in self.feedback.aggregates_by_agent_id(scope).await? {
            self.apply_rules(scope, &aggregate).await?;
        }
        Ok(())
    }

    async fn apply_rules(&self, scope: &Scope, aggregate: &FeedbackAggregate) -> EngramResult<()> {
        let mut policy = match self.policies.get(scope, aggregate.memory_type).await? {
            Some(policy) => policy,
            None => Policy::new(scope.clone(), aggregate.memory_type),
        };

        if aggregate.ignored_rate() > RATE_THRESHOLD {
            policy.priority_weight = (policy.priority_weight - PRIORITY_WEIGHT_STEP).max(MIN_PRIORITY_WEIGHT);
        }
        if aggregate.helpful_rate() > RATE_THRESHOLD {
            policy.priority_weight += PRIORITY_WEIGHT_STEP;
        }
        if aggregate.unhelpful_rate() > RATE_THRESHOLD {
            policy.max_memories = policy.max_memories.saturating_sub(MAX_MEMORIES_STEP).max(MIN_MAX_MEMORIES);
        }

        self.policies.upsert(&policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::MemoryType;

    #[test]
    fn rules_are_closed_and_respect_floors() {
        let mut policy = Policy::new(Scope::new("t1", "a1"), MemoryType::Fact);
        policy.priority_weight = 0.15;
        policy.max_memories = 15;

        let aggregate = FeedbackAggregate {
            memory_type: MemoryType::Fact,
            total: 20,
            used: 0,
            ignored: 16,
            helpful: 0,
            unhelpful: 15,
            contradicted: 0,
            outdated: 0,
        };
        assert!(aggregate.ignored_rate() > RATE_THRESHOLD);
        assert!(aggregate.unhelpful_rate() > RATE_THRESHOLD);

        if aggregate.ignored_rate() > RATE_THRESHOLD {
            policy.priority_weight = (policy.priority_weight - PRIORITY_WEIGHT_STEP).max(MIN_PRIORITY_WEIGHT);
        }
        if aggregate.unhelpful_rate() > RATE_THRESHOLD {
            policy.max_memories = policy.max_memories.saturating_sub(MAX_MEMORIES_STEP).max(MIN_MAX_MEMORIES);
        }

        assert!((policy.priority_weight - MIN_PRIORITY_WEIGHT).abs() < 1e-9);
        assert_eq!(policy.max_memories, MIN_MAX_MEMORIES);
    }

    #[tokio::test]
    async fn sweep_lowers_priority_weight_for_mostly_ignored_agent() {
        use chrono::Utc;
        use engram_core::memory::{Feedback, FeedbackSignal, Memory, Provenance};
        use engram_storage::Store;
        use uuid::Uuid;

        let store = Arc::new(Store::open_in_memory().unwrap());
        let config = WorkerConfig::default();
        let scope = Scope::new("t1", "agent-1");

        let memory = Memory::new(scope.clone(), MemoryType::Fact, "noted".to_string(), Provenance::User, "test".to_string());
        store.create(&memory).await.unwrap();

        for i in 0..config.tuner_min_feedback_count {
            let signal = if i < config.tuner_min_feedback_count - 1 {
                FeedbackSignal::Ignored
            } else {
                FeedbackSignal::Used
            };
            let feedback = Feedback {
                id: Uuid::new_v4(),
                scope: scope.clone(),
                memory_id: memory.id,
                signal,
                implicit: false,
                detector_confidence: None,
                created_at: Utc::now(),
            };
            store.create(&feedback).await.unwrap();
        }

        let worker = TunerWorker::new(store.clone(), store.clone(), store.clone(), config, vec!["t1".to_string()]);
        worker.sweep().await;

        let policy = store.get(&scope, MemoryType::Fact).await.unwrap().unwrap();
        assert!(policy.priority_weight < 1.0);
    }
}
