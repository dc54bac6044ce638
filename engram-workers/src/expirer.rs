//! Expirer worker (W3): TTL and retention-policy deletion (spec §4.13).

use std::sync::Arc;
use std::time::Duration;

use engram_core::errors::EngramResult;
use engram_core::memory::Scope;
use engram_core::traits::{MemoryStore, PolicyStore};

use crate::supervisor::Ticker;

/// Deletes memories past `expires_at` and, per policy, memories older
/// than `retention_days` (spec §4.13). Runs hourly by default; bounded to
/// a 30-second budget per tick.
pub struct ExpirerWorker {
    memories: Arc<dyn MemoryStore>,
    policies: Arc<dyn PolicyStore>,
    tenants: Vec<String>,
    ticker: Ticker,
}

impl ExpirerWorker {
    pub fn new(memories: Arc<dyn MemoryStore>, policies: Arc<dyn PolicyStore>, tenants: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            memories,
            policies,
            tenants,
            ticker: Ticker::new(),
        })
    }

    pub fn start(self: &Arc<Self>, tick: Duration, budget: Duration) {
        let this = self.clone();
        self.ticker.start("expirer", tick, budget, move || {
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
                    tracing::warn!(worker = "expirer", tenant, error = %err, "failed to list agents, skipping tenant");
                    continue;
                }
            };
            for agent_id in agent_ids {
                let scope = Scope::new(tenant.clone(), agent_id);
                if let Err(err) = self.expire_agent(&scope).await {
                    tracing::warn!(worker = "expirer", agent_id = %scope.agent_id, error = %err, "expiry sweep failed for agent, skipping");
                }
            }
        }
    }

    async fn expire_agent(&self, scope: &Scope) -> EngramResult<()> {
        let expired = self.memories.delete_expired(scope).await?;
        if expired > 0 {
            tracing::debug!(worker = "expirer", agent_id = %scope.agent_id, expired, "TTL-expired memories deleted");
        }

        for policy in self.policies.list_by_agent(scope).await? {
            let Some(retention_days) = policy.retention_days else {
                continue;
            };
            let deleted = self
                .memories
                .delete_by_retention(scope, policy.memory_type, retention_days)
                .await?;
            if deleted > 0 {
                tracing::debug!(
                    worker = "expirer",
                    agent_id = %scope.agent_id,
                    memory_type = policy.memory_type.as_str(),
                    retention_days,
                    deleted,
                    "retention-policy memories deleted"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engram_core::memory::{Memory, MemoryType, Policy, Provenance};
    use engram_storage::Store;

    fn scope() -> Scope {
        Scope::new("t1", "agent-1")
    }

    #[tokio::test]
    async fn deletes_memories_past_expires_at() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = ExpirerWorker::new(store.clone(), store.clone(), vec!["t1".to_string()]);

        let mut memory = Memory::new(scope(), MemoryType::Fact, "ttl".to_string(), Provenance::User, "test".to_string());
        memory.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        store.create(&memory).await.unwrap();

        worker.sweep().await;

        assert!(store.get(&scope(), memory.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deletes_memories_past_retention_days() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = ExpirerWorker::new(store.clone(), store.clone(), vec!["t1".to_string()]);

        let mut memory = Memory::new(scope(), MemoryType::Fact, "old".to_string(), Provenance::User, "test".to_string());
        memory.created_at = Utc::now() - chrono::Duration::days(10);
        store.create(&memory).await.unwrap();

        let mut policy = Policy::new(scope(), MemoryType::Fact);
        policy.retention_days = Some(5);
        store.upsert(&policy).await.unwrap();

        worker.sweep().await;

        assert!(store.get(&scope(), memory.id).await.unwrap().is_none());
    }
}
