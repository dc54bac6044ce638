use std::collections::HashMap;
use std::sync::Arc;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Memory, MemoryType, Policy, Provenance, Scope};
use engram_core::traits::{MemoryStore, PolicyStore};
use engram_providers::{Embedder, Llm};

/// Enforces per-type memory limits and exposes priority weights to the
/// recall scorer (spec §4.10).
pub struct PolicyService {
    policies: Arc<dyn PolicyStore>,
    memories: Arc<dyn MemoryStore>,
    llm: Arc<dyn Llm>,
    embedder: Arc<dyn Embedder>,
}

impl PolicyService {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        memories: Arc<dyn MemoryStore>,
        llm: Arc<dyn Llm>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            policies,
            memories,
            llm,
            embedder,
        }
    }

    /// Validate and persist a policy (spec §4.10: `type ∈ known, max_memories
    /// > 0, priority_weight > 0`). `MemoryType` is a closed enum so "known"
    /// is enforced by the type system at the call site.
    pub async fn upsert(&self, policy: &Policy) -> EngramResult<()> {
        if policy.max_memories == 0 {
            return Err(EngramError::PolicyMaxMemories);
        }
        if policy.priority_weight <= 0.0 {
            return Err(EngramError::PolicyPriorityWeight);
        }
        self.policies.upsert(policy).await
    }

    /// Feeds the recall scorer (spec §4.6): absent policies imply weight 1.
    pub async fn get_type_weights(&self, scope: &Scope) -> EngramResult<HashMap<MemoryType, f64>> {
        let policies = self.policies.list_by_agent(scope).await?;
        Ok(policies
            .into_iter()
            .map(|p| (p.memory_type, p.priority_weight))
            .collect())
    }

    /// Run on every successful belief create (spec §4.10). Best-effort by
    /// contract of the caller: this returns `Err` only on a primary store
    /// failure; the caller is expected to log and swallow it, matching the
    /// "async side-effects never fail the write" rule (spec §5).
    pub async fn enforce_on_create(&self, scope: &Scope, memory_type: MemoryType) -> EngramResult<()> {
        let Some(policy) = self.policies.get(scope, memory_type).await? else {
            return Ok(());
        };

        let count = self.memories.count_by_type(scope, memory_type).await?;
        let excess = count as i64 - policy.max_memories as i64;
        if excess <= 0 {
            return Ok(());
        }

        let oldest = self
            .memories
            .list_oldest_by_type(scope, memory_type, excess as usize)
            .await?;
        if oldest.is_empty() {
            return Ok(());
        }

        if policy.auto_summarize && self.llm.is_available() {
            self.summarize_and_replace(scope, memory_type, &oldest).await?;
        } else {
            for memory in &oldest {
                self.memories.delete(scope, memory.id).await?;
            }
        }
        Ok(())
    }

    async fn summarize_and_replace(
        &self,
        scope: &Scope,
        memory_type: MemoryType,
        oldest: &[Memory],
    ) -> EngramResult<()> {
        let contents: Vec<String> = oldest.iter().map(|m| m.content.clone()).collect();
        let summary = match self.llm.summarize(&contents).await {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(component = "policy", agent_id = %scope.agent_id, error = %err, "auto-summarize failed, falling back to plain eviction");
                for memory in oldest {
                    self.memories.delete(scope, memory.id).await?;
                }
                return Ok(());
            }
        };

        let mut summary_memory = Memory::new(
            scope.clone(),
            memory_type,
            summary.clone(),
            Provenance::Derived,
            "auto-summarize".to_string(),
        );
        summary_memory.confidence = 0.8;
        summary_memory.embedding = match self.embedder.embed(&summary).await {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(component = "policy", agent_id = %scope.agent_id, error = %err, "auto-summarize embedding failed");
                None
            }
        };

        self.memories.create(&summary_memory).await?;
        for memory in oldest {
            self.memories.delete(scope, memory.id).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_providers::mock::{MockEmbedder, MockLlm};
    use engram_storage::Store;
    use std::sync::Arc;

    fn make_service(store: Arc<Store>) -> PolicyService {
        PolicyService::new(
            store.clone(),
            store,
            Arc::new(MockLlm::default()),
            Arc::new(MockEmbedder::default()),
        )
    }

    #[tokio::test]
    async fn upsert_rejects_zero_max_memories() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = make_service(store);
        let scope = Scope::new("t1", "a1");
        let mut policy = Policy::new(scope, MemoryType::Fact);
        policy.max_memories = 0;
        let err = service.upsert(&policy).await.unwrap_err();
        assert_eq!(err.code(), "POLICY_MAX_MEMORIES");
    }

    #[tokio::test]
    async fn upsert_rejects_nonpositive_priority_weight() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = make_service(store);
        let scope = Scope::new("t1", "a1");
        let mut policy = Policy::new(scope, MemoryType::Fact);
        policy.priority_weight = 0.0;
        let err = service.upsert(&policy).await.unwrap_err();
        assert_eq!(err.code(), "POLICY_PRIORITY_WEIGHT");
    }

    #[tokio::test]
    async fn enforce_on_create_noop_without_policy() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = make_service(store);
        let scope = Scope::new("t1", "a1");
        service.enforce_on_create(&scope, MemoryType::Fact).await.unwrap();
    }

    #[tokio::test]
    async fn enforce_on_create_evicts_oldest_past_max() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let scope = Scope::new("t1", "a1");
        let mut policy = Policy::new(scope.clone(), MemoryType::Fact);
        policy.max_memories = 2;
        let service = make_service(store.clone());
        service.upsert(&policy).await.unwrap();

        for i in 0..4 {
            let m = Memory::new(
                scope.clone(),
                MemoryType::Fact,
                format!("fact {i}"),
                Provenance::User,
                "test".to_string(),
            );
            store.create(&m).await.unwrap();
        }

        service.enforce_on_create(&scope, MemoryType::Fact).await.unwrap();
        let remaining = store.count_by_type(&scope, MemoryType::Fact).await.unwrap();
        assert_eq!(remaining, 2);
    }

    #[tokio::test]
    async fn get_type_weights_reflects_policies() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let scope = Scope::new("t1", "a1");
        let mut policy = Policy::new(scope.clone(), MemoryType::Preference);
        policy.priority_weight = 1.5;
        let service = make_service(store);
        service.upsert(&policy).await.unwrap();

        let weights = service.get_type_weights(&scope).await.unwrap();
        assert_eq!(weights.get(&MemoryType::Preference), Some(&1.5));
    }
}
