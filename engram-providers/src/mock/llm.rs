use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryType, Outcome};

use crate::llm::{ClusterMember, ConversationTurn, Llm, SimilarMemorySummary};
use crate::types::{
    DetectedRelationship, EpisodeStructure, ExtractedBelief, ExtractedEntity, ExtractedProcedure,
    ImplicitFeedback, SchemaPattern, TensionKind, TensionVerdict,
};

/// A canned-response LLM for tests and offline operation. Every method
/// degrades to the conservative default named in its spec section rather
/// than erroring, matching how callers are required to treat a real
/// provider's failures.
#[derive(Debug, Default)]
pub struct MockLlm;

impl Llm for MockLlm {
    async fn classify(&self, _content: &str) -> EngramResult<MemoryType> {
        // spec §4.3 step 1: unclassifiable content falls back to Fact.
        Ok(MemoryType::Fact)
    }

    async fn extract(&self, _conversation: &[ConversationTurn]) -> EngramResult<Vec<ExtractedBelief>> {
        Ok(Vec::new())
    }

    async fn summarize(&self, memories: &[String]) -> EngramResult<String> {
        Ok(memories.join(" "))
    }

    async fn check_tension(&self, _a: &str, _b: &str) -> EngramResult<TensionVerdict> {
        Ok(TensionVerdict {
            kind: TensionKind::None,
            score: 0.0,
        })
    }

    async fn extract_episode_structure(&self, _text: &str) -> EngramResult<EpisodeStructure> {
        Ok(EpisodeStructure::default())
    }

    async fn extract_procedure(&self, _text: &str) -> EngramResult<Option<ExtractedProcedure>> {
        Ok(None)
    }

    async fn detect_schema_pattern(
        &self,
        _cluster: &[ClusterMember],
    ) -> EngramResult<Option<SchemaPattern>> {
        Ok(None)
    }

    async fn extract_entities(&self, _text: &str) -> EngramResult<Vec<ExtractedEntity>> {
        Ok(Vec::new())
    }

    async fn detect_relationships(
        &self,
        _memory_content: &str,
        _similar: &[SimilarMemorySummary],
    ) -> EngramResult<Vec<DetectedRelationship>> {
        Ok(Vec::new())
    }

    async fn detect_implicit_feedback(
        &self,
        _memories: &[String],
        _conversation: &[ConversationTurn],
    ) -> EngramResult<Vec<ImplicitFeedback>> {
        Ok(Vec::new())
    }

    async fn detect_outcome(&self, _text: &str) -> EngramResult<Outcome> {
        Ok(Outcome::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classify_falls_back_to_fact() {
        let llm = MockLlm;
        assert_eq!(llm.classify("anything").await.unwrap(), MemoryType::Fact);
    }

    #[tokio::test]
    async fn tension_defaults_to_none() {
        let llm = MockLlm;
        let v = llm.check_tension("a", "b").await.unwrap();
        assert_eq!(v.kind, TensionKind::None);
    }
}
