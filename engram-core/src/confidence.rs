//! Confidence algebra: log-odds updates, decay, tier classification.
//!
//! All signal-driven adjustments to a memory's confidence go through
//! [`apply_log_odds`], never through direct addition. Combining updates in
//! log-odds space makes sequential reinforcements and contradictions
//! commutative and keeps confidence strictly inside `(MIN_CONF, MAX_CONF)`.

use serde::{Deserialize, Serialize};

/// Lower clamp for any confidence value.
pub const MIN_CONF: f64 = 0.01;
/// Upper clamp for any confidence value.
pub const MAX_CONF: f64 = 0.99;

/// Confidence at or below which a memory is archived.
pub const ARCHIVE_THRESHOLD: f64 = 0.15;

/// Tier thresholds (inclusive lower bound).
pub const HOT_THRESHOLD: f64 = 0.85;
pub const WARM_THRESHOLD: f64 = 0.6;
pub const COLD_THRESHOLD: f64 = 0.3;

/// Retrieval tier computed from confidence. Never persisted — always
/// derived from the current confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Archive,
    Cold,
    Warm,
    Hot,
}

impl Tier {
    /// Tier-specific retrieval threshold used to further filter recall
    /// candidates after tier-membership filtering (spec §4.3 step 2).
    pub fn retrieval_threshold(self) -> f64 {
        match self {
            Tier::Hot => 0.0,
            Tier::Warm => 0.3,
            Tier::Cold => 0.5,
            Tier::Archive => 0.7,
        }
    }

    /// Whether memories in this tier are flagged for summarize-on-access.
    pub fn summarize_on_access(self) -> bool {
        matches!(self, Tier::Cold | Tier::Archive)
    }
}

/// Clamp `p` into `[MIN_CONF, MAX_CONF]`.
fn clamp_conf(p: f64) -> f64 {
    p.clamp(MIN_CONF, MAX_CONF)
}

/// Natural-log odds of `p`, with `p` clamped to the valid confidence range
/// before transforming so `logit` never returns +/- infinity.
pub fn logit(p: f64) -> f64 {
    let p = clamp_conf(p);
    (p / (1.0 - p)).ln()
}

/// Logistic sigmoid, the inverse of [`logit`].
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Apply a log-odds delta to a confidence value and clamp the result back
/// into `[MIN_CONF, MAX_CONF]`. This is the canonical update used by
/// feedback (§4.5), reconciliation (§4.3), and decay (§4.12/§4.11 Stage 5)
/// wherever the source material expresses an update as a log-odds shift.
pub fn apply_log_odds(c: f64, delta: f64) -> f64 {
    clamp_conf(sigmoid(logit(c) + delta))
}

/// Classify a confidence value into its retrieval tier.
pub fn compute_tier(confidence: f64) -> Tier {
    if confidence >= HOT_THRESHOLD {
        Tier::Hot
    } else if confidence >= WARM_THRESHOLD {
        Tier::Warm
    } else if confidence >= COLD_THRESHOLD {
        Tier::Cold
    } else {
        Tier::Archive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tier_boundaries() {
        assert_eq!(compute_tier(0.85), Tier::Hot);
        assert_eq!(compute_tier(0.84999), Tier::Warm);
        assert_eq!(compute_tier(0.6), Tier::Warm);
        assert_eq!(compute_tier(0.3), Tier::Cold);
        assert_eq!(compute_tier(0.29), Tier::Archive);
    }

    #[test]
    fn repeated_positive_updates_converge_to_max_without_exceeding() {
        let mut c = 0.5;
        for _ in 0..200 {
            c = apply_log_odds(c, 10.0);
            assert!(c <= MAX_CONF);
        }
        assert!((c - MAX_CONF).abs() < 1e-6);
    }

    #[test]
    fn repeated_negative_updates_converge_to_min_without_going_below() {
        let mut c = 0.5;
        for _ in 0..200 {
            c = apply_log_odds(c, -10.0);
            assert!(c >= MIN_CONF);
        }
        assert!((c - MIN_CONF).abs() < 1e-6);
    }

    #[test]
    fn diminishing_returns_near_extremes() {
        let delta = 0.3;
        let change_high = (apply_log_odds(0.97, delta) - 0.97).abs();
        let change_mid = (apply_log_odds(0.5, delta) - 0.5).abs();
        assert!(change_high < change_mid);

        let change_low = (apply_log_odds(0.15, -delta) - 0.15).abs();
        let change_mid2 = (apply_log_odds(0.5, -delta) - 0.5).abs();
        assert!(change_low < change_mid2);
    }

    proptest! {
        #[test]
        fn apply_log_odds_always_in_bounds(c in 0.0f64..=1.0, delta in -50.0f64..=50.0) {
            let result = apply_log_odds(c, delta);
            prop_assert!(result >= MIN_CONF && result <= MAX_CONF);
        }

        #[test]
        fn sigmoid_logit_roundtrip(p in MIN_CONF..=MAX_CONF) {
            let back = sigmoid(logit(p));
            prop_assert!((back - p).abs() < 1e-6);
        }
    }
}
