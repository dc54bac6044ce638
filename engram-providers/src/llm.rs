use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryType, Outcome};

use crate::types::{
    DetectedRelationship, EpisodeStructure, ExtractedBelief, ExtractedEntity, ExtractedProcedure,
    ImplicitFeedback, SchemaPattern, TensionVerdict,
};

/// One turn of conversation/memory context handed to the LLM for
/// belief/structure extraction.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// A similar memory summary handed to `detect_relationships` (spec §4.8).
#[derive(Debug, Clone)]
pub struct SimilarMemorySummary {
    pub content: String,
    pub memory_type: MemoryType,
}

/// A memory cluster member handed to `detect_schema_pattern` (spec §4.11
/// Stage 4).
#[derive(Debug, Clone)]
pub struct ClusterMember {
    pub content: String,
    pub memory_type: MemoryType,
}

/// LLM capability contract (spec §6). Every method may fail; callers MUST
/// treat failures as soft (degrade, warn) except where the calling
/// component's spec section says otherwise.
#[allow(async_fn_in_trait)]
pub trait Llm: Send + Sync {
    async fn classify(&self, content: &str) -> EngramResult<MemoryType>;
    async fn extract(&self, conversation: &[ConversationTurn]) -> EngramResult<Vec<ExtractedBelief>>;
    async fn summarize(&self, memories: &[String]) -> EngramResult<String>;
    async fn check_tension(&self, a: &str, b: &str) -> EngramResult<TensionVerdict>;
    async fn extract_episode_structure(&self, text: &str) -> EngramResult<EpisodeStructure>;
    async fn extract_procedure(&self, text: &str) -> EngramResult<Option<ExtractedProcedure>>;
    async fn detect_schema_pattern(&self, cluster: &[ClusterMember]) -> EngramResult<Option<SchemaPattern>>;
    async fn extract_entities(&self, text: &str) -> EngramResult<Vec<ExtractedEntity>>;
    async fn detect_relationships(
        &self,
        memory_content: &str,
        similar: &[SimilarMemorySummary],
    ) -> EngramResult<Vec<DetectedRelationship>>;
    async fn detect_implicit_feedback(
        &self,
        memories: &[String],
        conversation: &[ConversationTurn],
    ) -> EngramResult<Vec<ImplicitFeedback>>;
    async fn detect_outcome(&self, text: &str) -> EngramResult<Outcome>;
}
