use std::sync::Arc;

use uuid::Uuid;

use engram_core::confidence::apply_log_odds;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Feedback, FeedbackSignal, MutationLogEntry, Outcome, Scope};
use engram_core::traits::{EpisodeStore, FeedbackStore, MemoryStore, MutationLogStore};

/// Minimum detector confidence an LLM-inferred implicit signal must clear
/// before it is applied (spec §4.5).
const IMPLICIT_CONFIDENCE_FLOOR: f64 = 0.6;

/// A feedback event to record, prior to signal validation (spec §4.5
/// "Create(feedback) validates ... signal ∈ table").
pub struct RecordFeedbackRequest {
    pub scope: Scope,
    pub memory_id: Uuid,
    pub signal: String,
    pub implicit: bool,
    pub detector_confidence: Option<f64>,
}

/// Feedback application and outcome propagation (spec §4.5, component C5).
pub struct FeedbackService {
    memories: Arc<dyn MemoryStore>,
    episodes: Arc<dyn EpisodeStore>,
    feedback: Arc<dyn FeedbackStore>,
    mutation_log: Arc<dyn MutationLogStore>,
}

impl FeedbackService {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        episodes: Arc<dyn EpisodeStore>,
        feedback: Arc<dyn FeedbackStore>,
        mutation_log: Arc<dyn MutationLogStore>,
    ) -> Self {
        Self {
            memories,
            episodes,
            feedback,
            mutation_log,
        }
    }

    /// Explicit feedback create (spec §4.5).
    pub async fn record(&self, req: RecordFeedbackRequest) -> EngramResult<Feedback> {
        if req.scope.agent_id.trim().is_empty() {
            return Err(EngramError::AgentMissing);
        }
        let signal = FeedbackSignal::parse(&req.signal).ok_or_else(|| EngramError::FeedbackInvalidSignal { signal: req.signal.clone() })?;

        self.apply(&req.scope, req.memory_id, signal, req.implicit, req.detector_confidence).await
    }

    /// Implicit, LLM-inferred feedback (spec §4.5). Silently ignored below
    /// the detector-confidence floor rather than erroring, since a weak
    /// inference is simply not actionable, not a caller mistake.
    pub async fn record_implicit(&self, req: RecordFeedbackRequest) -> EngramResult<Option<Feedback>> {
        if req.detector_confidence.unwrap_or(0.0) < IMPLICIT_CONFIDENCE_FLOOR {
            tracing::debug!(
                component = "learning",
                memory_id = %req.memory_id,
                confidence = req.detector_confidence,
                "implicit feedback below detector confidence floor, ignored"
            );
            return Ok(None);
        }
        self.record(req).await.map(Some)
    }

    /// Outcome propagation from a completed episode (spec §4.5): maps
    /// `success -> helpful`, `failure -> unhelpful`, `neutral -> no-op`,
    /// applied to every memory the episode derived (spec §4.11 Stage 2's
    /// `derived_semantic_ids`, the episode's record of memories it produced).
    pub async fn propagate_episode_outcome(&self, scope: &Scope, episode_id: Uuid) -> EngramResult<usize> {
        let episode = self
            .episodes
            .get(scope, episode_id)
            .await?
            .ok_or_else(|| EngramError::EpisodeNotFound { id: episode_id.to_string() })?;

        let signal = match episode.outcome {
            Outcome::Success => FeedbackSignal::Helpful,
            Outcome::Failure => FeedbackSignal::Unhelpful,
            Outcome::Neutral | Outcome::Unknown => return Ok(0),
        };

        let mut applied = 0;
        for memory_id in &episode.derived_semantic_ids {
            if let Err(err) = self.apply(scope, *memory_id, signal, false, None).await {
                tracing::warn!(component = "learning", episode_id = %episode_id, memory_id = %memory_id, error = %err, "outcome propagation failed for memory");
                continue;
            }
            applied += 1;
        }
        Ok(applied)
    }

    async fn apply(
        &self,
        scope: &Scope,
        memory_id: Uuid,
        signal: FeedbackSignal,
        implicit: bool,
        detector_confidence: Option<f64>,
    ) -> EngramResult<Feedback> {
        let memory = self
            .memories
            .get(scope, memory_id)
            .await?
            .ok_or_else(|| EngramError::MemoryNotFound { id: memory_id.to_string() })?;

        let effect = signal.effect();
        let new_confidence = apply_log_odds(memory.confidence, effect.log_odds_delta);
        let new_reinforcement = (memory.reinforcement_count as i64 + effect.reinforcement_delta as i64).max(0) as u32;

        self.memories.update_confidence(scope, memory_id, new_confidence).await?;
        self.memories.update_reinforcement(scope, memory_id, new_reinforcement).await?;
        if effect.trigger_review {
            self.memories.set_needs_review(scope, memory_id, true).await?;
        }

        let entry = MutationLogEntry::new(
            scope.clone(),
            "memory",
            memory_id,
            memory.confidence,
            new_confidence,
            memory.reinforcement_count as i64,
            new_reinforcement as i64,
            format!("feedback:{}", signal_str(signal)),
        );
        self.mutation_log.append(&entry).await?;

        let feedback = Feedback {
            id: Uuid::new_v4(),
            scope: scope.clone(),
            memory_id,
            signal,
            implicit,
            detector_confidence,
            created_at: chrono::Utc::now(),
        };
        self.feedback.create(&feedback).await?;

        Ok(feedback)
    }
}

fn signal_str(signal: FeedbackSignal) -> &'static str {
    match signal {
        FeedbackSignal::Used => "used",
        FeedbackSignal::Ignored => "ignored",
        FeedbackSignal::Helpful => "helpful",
        FeedbackSignal::Unhelpful => "unhelpful",
        FeedbackSignal::Contradicted => "contradicted",
        FeedbackSignal::Outdated => "outdated",
    }
}
