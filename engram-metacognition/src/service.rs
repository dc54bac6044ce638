use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use engram_core::confidence::{self, apply_log_odds, ARCHIVE_THRESHOLD, COLD_THRESHOLD};
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Memory, Outcome, Procedure, Scope};
use engram_core::traits::{EpisodeStore, FeedbackStore, MemoryStore, ProcedureStore};

/// Window over which "recency of last verification" decays to roughly a
/// third of its starting weight (spec §4.15).
const VERIFICATION_HALF_LIFE_DAYS: f64 = 30.0;
/// How far back strategy reflection looks for failure episodes (spec
/// §4.15 "recent failure topics").
const STRATEGY_LOOKBACK_DAYS: i64 = 30;
/// A belief untouched longer than this is "stale" for the uncertainty
/// report (spec §4.15). Not named numerically in the spec; chosen to
/// match the consolidation Stage-5 decay window it sits alongside — see
/// DESIGN.md "Metacognitive thresholds".
const STALE_DAYS: i64 = 30;
/// Thresholds a procedure must clear to count as "effective" (spec
/// §4.15).
const EFFECTIVE_SUCCESS_RATE: f64 = 0.8;
const EFFECTIVE_MIN_USE: u32 = 10;

/// Per-factor breakdown behind a reassessed confidence value (spec
/// §4.15). Every factor is expressed as a log-odds delta so they combine
/// the same commutative way every other confidence update in this
/// workspace does (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceReassessment {
    pub memory_id: Uuid,
    pub original_confidence: f64,
    pub reassessed_confidence: f64,
    pub recency_delta: f64,
    pub reinforcement_delta: f64,
    pub source_reliability_delta: f64,
    pub contradiction_delta: f64,
}

/// Tally + advisory summary of uncertain beliefs (spec §4.15).
#[derive(Debug, Clone)]
pub struct UncertaintyReport {
    pub low_confidence_count: usize,
    pub stale_count: usize,
    pub contradicted_count: usize,
    pub total_considered: usize,
    pub advisory: String,
}

/// Procedural strategy reflection (spec §4.15): which skills are working,
/// which aren't, and what's been failing lately.
#[derive(Debug, Clone)]
pub struct StrategyReflection {
    pub effective: Vec<Procedure>,
    pub underperforming: Vec<Procedure>,
    pub recent_failure_topics: Vec<(String, usize)>,
}

/// Read-only reports over the stores: confidence reassessment, uncertainty,
/// and procedural strategy reflection (spec §4.15, component A1). Never
/// mutates anything — every number here is recomputed on demand from
/// current store state.
pub struct MetacognitiveService {
    memories: Arc<dyn MemoryStore>,
    episodes: Arc<dyn EpisodeStore>,
    procedures: Arc<dyn ProcedureStore>,
    feedback: Arc<dyn FeedbackStore>,
}

impl MetacognitiveService {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        episodes: Arc<dyn EpisodeStore>,
        procedures: Arc<dyn ProcedureStore>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Self {
        Self {
            memories,
            episodes,
            procedures,
            feedback,
        }
    }

    /// Reassess one belief's confidence from recency, reinforcement
    /// saturation, source reliability, and contradiction history (spec
    /// §4.15). This is advisory only — callers decide whether to persist
    /// `reassessed_confidence` via the normal update path.
    pub async fn reassess_confidence(&self, scope: &Scope, memory_id: Uuid) -> EngramResult<ConfidenceReassessment> {
        let memory = self
            .memories
            .get(scope, memory_id)
            .await?
            .ok_or_else(|| EngramError::MemoryNotFound { id: memory_id.to_string() })?;

        let hours_since_access = (Utc::now() - memory.last_accessed_at).num_seconds().max(0) as f64 / 3600.0;
        let days_since_access = hours_since_access / 24.0;
        // Recency: exp decay over 30 days, centered so "just verified"
        // pushes confidence up and "long stale" pushes it down.
        let recency_weight = (-days_since_access / VERIFICATION_HALF_LIFE_DAYS).exp();
        let recency_delta = (recency_weight - 0.5) * 0.6;

        // Reinforcement saturation: log-shape, diminishing per additional
        // reinforcement, capped well short of dominating the other factors.
        let reinforcement_delta = ((memory.reinforcement_count as f64 + 1.0).ln()) * 0.15;

        // Source reliability: centered on the "tool" baseline (0.85) so a
        // user-provenance belief nudges up and an inferred one nudges down.
        let source_reliability_delta = (memory.provenance.reliability() - 0.85) * 0.8;

        let contradictions = self
            .feedback
            .list_for_memory(scope, memory_id)
            .await?
            .into_iter()
            .filter(|f| f.signal == engram_core::memory::FeedbackSignal::Contradicted)
            .count();
        let contradiction_delta = -(contradictions as f64) * 0.4;

        let total_delta = recency_delta + reinforcement_delta + source_reliability_delta + contradiction_delta;
        let reassessed_confidence = apply_log_odds(memory.confidence, total_delta);

        Ok(ConfidenceReassessment {
            memory_id,
            original_confidence: memory.confidence,
            reassessed_confidence,
            recency_delta,
            reinforcement_delta,
            source_reliability_delta,
            contradiction_delta,
        })
    }

    /// Tally low-confidence, stale, and contradicted beliefs for an agent
    /// and render an advisory string (spec §4.15).
    pub async fn uncertainty_report(&self, scope: &Scope) -> EngramResult<UncertaintyReport> {
        let memories: Vec<Memory> = self.memories.list_by_agent_for_decay(scope).await?;
        let now = Utc::now();

        let low_confidence_count = memories.iter().filter(|m| m.confidence < COLD_THRESHOLD).count();
        let stale_count = memories.iter().filter(|m| (now - m.last_accessed_at).num_days() >= STALE_DAYS).count();
        let contradicted_count = memories.iter().filter(|m| m.needs_review).count();

        let advisory = if memories.is_empty() {
            "no beliefs recorded for this agent yet".to_string()
        } else if low_confidence_count == 0 && stale_count == 0 && contradicted_count == 0 {
            "belief set is stable: no low-confidence, stale, or contradicted beliefs".to_string()
        } else {
            format!(
                "{low_confidence_count} belief(s) below the cold-tier threshold ({:.2}), {stale_count} unverified for {STALE_DAYS}+ days, {contradicted_count} flagged for review after contradiction",
                COLD_THRESHOLD
            )
        };

        Ok(UncertaintyReport {
            low_confidence_count,
            stale_count,
            contradicted_count,
            total_considered: memories.len(),
            advisory,
        })
    }

    /// Partition procedures into effective/underperforming and aggregate
    /// recent failure-episode topics (spec §4.15).
    pub async fn strategy_reflection(&self, scope: &Scope) -> EngramResult<StrategyReflection> {
        let procedures = self.procedures.list_by_agent(scope).await?;
        let mut effective = Vec::new();
        let mut underperforming = Vec::new();

        for procedure in procedures {
            if procedure.archived {
                continue;
            }
            if procedure.success_rate() >= EFFECTIVE_SUCCESS_RATE && procedure.use_count >= EFFECTIVE_MIN_USE {
                effective.push(procedure);
            } else {
                underperforming.push(procedure);
            }
        }

        let since = Utc::now() - chrono::Duration::days(STRATEGY_LOOKBACK_DAYS);
        let failures = self.episodes.recent_by_outcome_since(scope, Outcome::Failure, since, 0.0).await?;
        let mut topic_counts: HashMap<String, usize> = HashMap::new();
        for episode in &failures {
            for topic in &episode.topics {
                *topic_counts.entry(topic.clone()).or_insert(0) += 1;
            }
        }
        let mut recent_failure_topics: Vec<(String, usize)> = topic_counts.into_iter().collect();
        recent_failure_topics.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        Ok(StrategyReflection {
            effective,
            underperforming,
            recent_failure_topics,
        })
    }
}

/// Whether a memory sits at or below the archive floor, used by the
/// uncertainty report's advisory copy (kept here rather than duplicated
/// as a magic number — spec §3).
pub fn is_archive_floor(confidence: f64) -> bool {
    confidence <= ARCHIVE_THRESHOLD
}

/// Re-exported so callers can classify a reassessed value without a
/// second import of `engram_core::confidence`.
pub fn tier_of(confidence: f64) -> confidence::Tier {
    confidence::compute_tier(confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_core::memory::{MemoryType, Provenance};
    use engram_storage::Store;

    fn scope() -> Scope {
        Scope::new("t1", "agent-1")
    }

    #[tokio::test]
    async fn reassessment_penalizes_contradicted_memory() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = MetacognitiveService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let mut memory = Memory::new(scope(), MemoryType::Fact, "m".to_string(), Provenance::User, "test".to_string());
        memory.confidence = 0.8;
        memory.needs_review = true;
        store.create(&memory).await.unwrap();

        let feedback = engram_core::memory::Feedback {
            id: Uuid::new_v4(),
            scope: scope(),
            memory_id: memory.id,
            signal: engram_core::memory::FeedbackSignal::Contradicted,
            implicit: false,
            detector_confidence: None,
            created_at: Utc::now(),
        };
        store.create(&feedback).await.unwrap();

        let reassessment = service.reassess_confidence(&scope(), memory.id).await.unwrap();
        assert!(reassessment.contradiction_delta < 0.0);
        assert!(reassessment.reassessed_confidence < reassessment.original_confidence);
    }

    #[tokio::test]
    async fn uncertainty_report_counts_low_confidence_beliefs() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = MetacognitiveService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let mut weak = Memory::new(scope(), MemoryType::Fact, "weak".to_string(), Provenance::User, "test".to_string());
        weak.confidence = 0.2;
        store.create(&weak).await.unwrap();

        let report = service.uncertainty_report(&scope()).await.unwrap();
        assert_eq!(report.low_confidence_count, 1);
        assert_eq!(report.total_considered, 1);
    }

    #[tokio::test]
    async fn strategy_reflection_partitions_by_success_rate_and_use_count() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let service = MetacognitiveService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let mut strong = Procedure::new(scope(), "trigger".to_string(), vec![], "do it".to_string(), "action".to_string());
        strong.use_count = 12;
        strong.success_count = 11;
        strong.failure_count = 1;
        store.create(&strong).await.unwrap();

        let mut weak = Procedure::new(scope(), "trigger2".to_string(), vec![], "do it2".to_string(), "action".to_string());
        weak.use_count = 12;
        weak.success_count = 2;
        weak.failure_count = 10;
        store.create(&weak).await.unwrap();

        let reflection = service.strategy_reflection(&scope()).await.unwrap();
        assert_eq!(reflection.effective.len(), 1);
        assert_eq!(reflection.underperforming.len(), 1);
    }
}
