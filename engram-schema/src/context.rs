use engram_core::memory::Schema;

/// Score a schema against the active working-memory cues and context
/// messages (spec §4.9.1): `+0.2` per cue containing an applicable
/// context, `+0.1` per context message whose lowercase content contains
/// an attribute key, then the sum is scaled by the schema's own
/// confidence and capped at 1.0.
pub fn context_match_score(schema: &Schema, cues: &[String], context_messages: &[String]) -> f32 {
    let mut score = 0.0f32;

    for cue in cues {
        if schema.applicable_contexts.iter().any(|ctx| cue.contains(ctx.as_str())) {
            score += 0.2;
        }
    }

    for message in context_messages {
        let lower = message.to_lowercase();
        for key in schema.attributes.keys() {
            if lower.contains(&key.to_lowercase()) {
                score += 0.1;
            }
        }
    }

    (score * schema.confidence as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use engram_core::memory::Scope;

    use super::*;

    fn make_schema(confidence: f64) -> Schema {
        let mut schema = Schema::new(
            Scope::new("t1", "bot-1"),
            "user_archetype".to_string(),
            "night_owl".to_string(),
            "works late".to_string(),
            vec![],
            vec![],
            confidence,
        );
        schema.applicable_contexts = vec!["late night coding".to_string()];
        schema.attributes = HashMap::from([("timezone".to_string(), "utc".to_string())]);
        schema
    }

    #[test]
    fn score_combines_cue_and_context_hits_scaled_by_confidence() {
        let schema = make_schema(0.8);
        let cues = vec!["late night coding session".to_string()];
        let context = vec!["user is in UTC and prefers dark mode".to_string()];

        let score = context_match_score(&schema, &cues, &context);
        assert!((score - (0.3 * 0.8)).abs() < 1e-6);
    }

    #[test]
    fn score_caps_at_one() {
        let schema = make_schema(1.0);
        let cues: Vec<String> = (0..10).map(|_| "late night coding".to_string()).collect();
        let score = context_match_score(&schema, &cues, &[]);
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn no_matches_scores_zero() {
        let schema = make_schema(0.9);
        let score = context_match_score(&schema, &["unrelated".to_string()], &["also unrelated".to_string()]);
        assert_eq!(score, 0.0);
    }
}
