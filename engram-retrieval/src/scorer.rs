use std::collections::HashMap;

use chrono::{DateTime, Utc};
use engram_core::memory::{Memory, MemoryType};
use engram_core::traits::ScoredMemory;

/// Composite recall ranking (spec §4.6): `final = s * c * exp(-FRESHNESS_DECAY
/// * h) * w_t`, where `h` is the memory's age in hours since `updated_at` and
/// `w_t` is the per-type priority weight (default `1.0` for types without an
/// explicit policy).
pub fn score(
    similarity: f32,
    confidence: f64,
    updated_at: DateTime<Utc>,
    now: DateTime<Utc>,
    freshness_decay: f64,
    type_weight: f64,
) -> f64 {
    let hours = (now - updated_at).num_seconds().max(0) as f64 / 3600.0;
    similarity as f64 * confidence * (-freshness_decay * hours).exp() * type_weight
}

fn type_weight(weights: &HashMap<MemoryType, f64>, memory_type: MemoryType) -> f64 {
    weights.get(&memory_type).copied().unwrap_or(1.0)
}

/// Rank recall candidates by the composite scorer and truncate to `top_k`.
pub fn rank(
    candidates: Vec<ScoredMemory>,
    weights: &HashMap<MemoryType, f64>,
    freshness_decay: f64,
    top_k: usize,
    now: DateTime<Utc>,
) -> Vec<Memory> {
    let mut scored: Vec<(f64, Memory)> = candidates
        .into_iter()
        .map(|c| {
            let w = type_weight(weights, c.memory.memory_type);
            let s = score(c.similarity, c.memory.confidence, c.memory.updated_at, now, freshness_decay, w);
            (s, c.memory)
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored.into_iter().map(|(_, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn higher_similarity_and_confidence_outrank_under_identical_freshness() {
        let now = Utc::now();
        let a = score(0.9, 0.9, now, now, 1e-4, 1.0);
        let b = score(0.5, 0.5, now, now, 1e-4, 1.0);
        assert!(a > b);
    }

    #[test]
    fn older_memories_score_lower_for_identical_similarity_and_confidence() {
        let now = Utc::now();
        let fresh = score(0.8, 0.8, now, now, 1e-4, 1.0);
        let stale = score(0.8, 0.8, now - Duration::hours(1000), now, 1e-4, 1.0);
        assert!(fresh > stale);
    }

    #[test]
    fn rank_respects_top_k() {
        let now = Utc::now();
        let scope = engram_core::memory::Scope::new("t", "a");
        let candidates: Vec<ScoredMemory> = (0..5)
            .map(|i| ScoredMemory {
                memory: {
                    let mut m = Memory::new(
                        scope.clone(),
                        MemoryType::Fact,
                        format!("m{i}"),
                        engram_core::memory::Provenance::User,
                        "test".into(),
                    );
                    m.confidence = 0.9;
                    m
                },
                similarity: 0.5,
            })
            .collect();
        let ranked = rank(candidates, &HashMap::new(), 1e-4, 3, now);
        assert_eq!(ranked.len(), 3);
    }
}
