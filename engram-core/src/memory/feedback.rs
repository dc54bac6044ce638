use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// A graded feedback signal applied to a memory (spec §3/§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignal {
    Used,
    Ignored,
    Helpful,
    Unhelpful,
    Contradicted,
    Outdated,
}

impl FeedbackSignal {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "used" => Some(FeedbackSignal::Used),
            "ignored" => Some(FeedbackSignal::Ignored),
            "helpful" => Some(FeedbackSignal::Helpful),
            "unhelpful" => Some(FeedbackSignal::Unhelpful),
            "contradicted" => Some(FeedbackSignal::Contradicted),
            "outdated" => Some(FeedbackSignal::Outdated),
            _ => None,
        }
    }

    /// Look up this signal's fixed effect in the closed table (spec §4.5).
    pub fn effect(self) -> FeedbackEffect {
        FEEDBACK_EFFECTS
            .iter()
            .find(|(signal, _)| *signal == self)
            .map(|(_, effect)| *effect)
            .expect("FEEDBACK_EFFECTS covers every FeedbackSignal variant")
    }
}

/// The fixed effect a signal has on a memory's confidence and
/// reinforcement count, plus any side effects.
#[derive(Debug, Clone, Copy)]
pub struct FeedbackEffect {
    pub log_odds_delta: f64,
    pub reinforcement_delta: i32,
    pub trigger_review: bool,
    pub trigger_summarize: bool,
}

/// Closed table of signal -> effect (spec §4.5). Immutable by contract:
/// extending it means adding a new `FeedbackSignal` variant, not editing
/// these numbers in place.
pub const FEEDBACK_EFFECTS: &[(FeedbackSignal, FeedbackEffect)] = &[
    (
        FeedbackSignal::Used,
        FeedbackEffect {
            log_odds_delta: 0.1,
            reinforcement_delta: 0,
            trigger_review: false,
            trigger_summarize: false,
        },
    ),
    (
        FeedbackSignal::Ignored,
        FeedbackEffect {
            log_odds_delta: -0.1,
            reinforcement_delta: 0,
            trigger_review: false,
            trigger_summarize: false,
        },
    ),
    (
        FeedbackSignal::Helpful,
        FeedbackEffect {
            log_odds_delta: 0.3,
            reinforcement_delta: 1,
            trigger_review: false,
            trigger_summarize: false,
        },
    ),
    (
        FeedbackSignal::Unhelpful,
        FeedbackEffect {
            log_odds_delta: -0.5,
            reinforcement_delta: -1,
            trigger_review: false,
            trigger_summarize: false,
        },
    ),
    (
        FeedbackSignal::Contradicted,
        FeedbackEffect {
            log_odds_delta: -1.0,
            reinforcement_delta: -2,
            trigger_review: true,
            trigger_summarize: false,
        },
    ),
    (
        FeedbackSignal::Outdated,
        FeedbackEffect {
            log_odds_delta: -0.8,
            reinforcement_delta: -1,
            trigger_review: false,
            trigger_summarize: true,
        },
    ),
];

/// A single recorded feedback event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub scope: Scope,
    pub memory_id: Uuid,
    pub signal: FeedbackSignal,
    pub implicit: bool,
    pub detector_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signal_has_an_effect_entry() {
        for signal in [
            FeedbackSignal::Used,
            FeedbackSignal::Ignored,
            FeedbackSignal::Helpful,
            FeedbackSignal::Unhelpful,
            FeedbackSignal::Contradicted,
            FeedbackSignal::Outdated,
        ] {
            let _ = signal.effect();
        }
    }

    #[test]
    fn contradicted_flags_review_not_summarize() {
        let effect = FeedbackSignal::Contradicted.effect();
        assert!(effect.trigger_review);
        assert!(!effect.trigger_summarize);
    }

    #[test]
    fn outdated_flags_summarize_not_review() {
        let effect = FeedbackSignal::Outdated.effect();
        assert!(!effect.trigger_review);
        assert!(effect.trigger_summarize);
    }
}
