//! Decay worker (W1): competition-aware belief forgetting (spec §4.12).

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use engram_core::confidence::{compute_tier, ARCHIVE_THRESHOLD};
use engram_core::config::DecayConfig;
use engram_core::errors::EngramResult;
use engram_core::memory::Scope;
use engram_core::traits::{EpisodeStore, MemoryStore};
use engram_core::vector::cosine_similarity;

use crate::supervisor::Ticker;

/// Competition-aware confidence decay plus episode decay/archival (spec
/// §4.12). Runs hourly by default; bounded to a 10-minute budget per tick
/// (spec §5).
pub struct DecayWorker {
    memories: Arc<dyn MemoryStore>,
    episodes: Arc<dyn EpisodeStore>,
    config: DecayConfig,
    tenants: Vec<String>,
    ticker: Ticker,
}

impl DecayWorker {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        episodes: Arc<dyn EpisodeStore>,
        config: DecayConfig,
        tenants: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            memories,
            episodes,
            config,
            tenants,
            ticker: Ticker::new(),
        })
    }

    pub fn start(self: &Arc<Self>, tick: Duration, budget: Duration) {
        let this = self.clone();
        self.ticker.start("decay", tick, budget, move || {
            let this = this.clone();
            async move { this.sweep().await }
        });
    }

    pub async fn stop(&self) {
        self.ticker.stop().await;
    }

    /// One full sweep over every tenant/agent (spec §5: "workers check
    /// cancellation between agents").
    pub async fn sweep(&self) {
        for tenant in &self.tenants {
            let agent_ids = match self.memories.list_distinct_agent_ids(tenant).await {
                Ok(ids) => ids,
                Err(err) => {
                    tracing::warn!(worker = "decay", tenant, error = %err, "failed to list agents, skipping tenant");
                    continue;
                }
            };
            for agent_id in agent_ids {
                let scope = Scope::new(tenant.clone(), agent_id);
                if let Err(err) = self.decay_memories(&scope).await {
                    tracing::warn!(worker = "decay", agent_id = %scope.agent_id, error = %err, "memory decay failed for agent, skipping");
                }
                if let Err(err) = self.decay_episodes(&scope).await {
                    tracing::warn!(worker = "decay", agent_id = %scope.agent_id, error = %err, "episode decay failed for agent, skipping");
                }
            }
        }
    }

    async fn decay_memories(&self, scope: &Scope) -> EngramResult<()> {
        let memories = self.memories.list_by_agent_for_decay(scope).await?;
        let now = Utc::now();

        for memory in &memories {
            let hours_since = (now - memory.last_accessed_at).num_seconds().max(0) as f64 / 3600.0;
            if hours_since < 1.0 {
                continue;
            }

            // Step 1: competitors — same type, non-empty embedding, cosine
            // >= threshold, capped.
            let mut competitors: Vec<(f64, f32)> = match memory.embedding.as_deref() {
                Some(embedding) => memories
                    .iter()
                    .filter(|m| m.id != memory.id && m.memory_type == memory.memory_type)
                    .filter_map(|m| {
                        let other = m.embedding.as_deref()?;
                        let sim = cosine_similarity(embedding, other);
                        (sim >= self.config.competitor_similarity_threshold).then_some((m.confidence, sim))
                    })
                    .collect(),
                None => Vec::new(),
            };
            competitors.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            competitors.truncate(self.config.competitor_cap);

            // Step 2: competition factor, normalized by (1 + c), scaled by weight.
            let competition: f64 = competitors
                .iter()
                .filter(|(c_comp, _)| *c_comp > memory.confidence)
                .map(|(c_comp, sim)| (c_comp - memory.confidence) * (*sim as f64))
                .sum::<f64>()
                / (1.0 + memory.confidence)
                * self.config.competition_weight;

            // Step 3: effective decay rate.
            let lambda_eff = self.config.lambda_base * (1.0 + competition);

            // Step 4: distance-to-floor decay.
            let floor = self.config.floor;
            let mut c_new = floor + (memory.confidence - floor) * (-lambda_eff * hours_since).exp();

            // Step 5: reinforcement resistance.
            let b = 1.0 + self.config.resist_coefficient * ((memory.reinforcement_count as f64 + 1.0).ln());
            let resist = 1.0 - 1.0 / b;
            c_new += (memory.confidence - c_new) * resist;

            // Step 6: decay never increases confidence.
            c_new = c_new.clamp(floor, memory.confidence);

            // Step 7: archive-or-update with tier-transition logging.
            if c_new < ARCHIVE_THRESHOLD {
                self.memories.archive(scope, memory.id).await?;
            } else if (c_new - memory.confidence).abs() > 0.001 {
                let old_tier = memory.tier();
                self.memories.update_confidence(scope, memory.id, c_new).await?;
                let new_tier = compute_tier(c_new);
                if new_tier != old_tier {
                    tracing::info!(
                        worker = "decay",
                        memory_id = %memory.id,
                        from = ?old_tier,
                        to = ?new_tier,
                        "memory tier transition"
                    );
                }
            }
        }
        Ok(())
    }

    async fn decay_episodes(&self, scope: &Scope) -> EngramResult<()> {
        let archived = self.episodes.apply_decay(scope, ARCHIVE_THRESHOLD as f32).await?;
        if archived > 0 {
            tracing::debug!(worker = "decay", agent_id = %scope.agent_id, archived, "episodes archived by decay");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{Memory, MemoryType, Provenance};
    use engram_storage::Store;

    fn scope() -> Scope {
        Scope::new("t1", "agent-1")
    }

    #[tokio::test]
    async fn hot_memory_below_one_hour_is_untouched() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = DecayWorker::new(store.clone(), store.clone(), DecayConfig::default(), vec!["t1".to_string()]);

        let mut memory = Memory::new(scope(), MemoryType::Fact, "fresh".to_string(), Provenance::User, "test".to_string());
        memory.confidence = 0.9;
        store.create(&memory).await.unwrap();

        worker.sweep().await;

        let reloaded = store.get(&scope(), memory.id).await.unwrap().unwrap();
        assert!((reloaded.confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn stale_low_confidence_memory_gets_archived() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = DecayWorker::new(store.clone(), store.clone(), DecayConfig::default(), vec!["t1".to_string()]);

        let mut memory = Memory::new(scope(), MemoryType::Fact, "weak".to_string(), Provenance::User, "test".to_string());
        memory.confidence = 0.105;
        memory.last_accessed_at = Utc::now() - chrono::Duration::hours(3);
        store.create(&memory).await.unwrap();

        worker.sweep().await;

        let reloaded = store.get(&scope(), memory.id).await.unwrap().unwrap();
        assert!(reloaded.archived);
    }
}
