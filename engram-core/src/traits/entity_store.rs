use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{Entity, EntityMention, Scope};

/// An entity paired with the similarity score that produced the hit.
#[derive(Debug, Clone)]
pub struct ScoredEntity {
    pub entity: Entity,
    pub similarity: f32,
}

/// Persistence contract for the graph builder's entity resolution
/// pipeline (spec §4.8). Not one of spec §4.2's named store contracts —
/// added because entity resolution/mention tracking has no other home;
/// see DESIGN.md "Entity store".
#[allow(async_fn_in_trait)]
pub trait EntityStore: Send + Sync {
    async fn create(&self, entity: &Entity) -> EngramResult<()>;
    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Entity>>;

    /// Exact name-or-alias match within an entity type (spec §4.8 step 2,
    /// first resolution tier).
    async fn find_by_name(&self, scope: &Scope, entity_type: &str, name: &str) -> EngramResult<Option<Entity>>;

    /// Exact name-or-alias match across every entity type, used by hybrid
    /// recall's entity-prefixed boost (spec §4.7), which takes a bare
    /// entity name with no type hint.
    async fn find_all_by_name(&self, scope: &Scope, name: &str) -> EngramResult<Vec<Entity>>;

    /// Embedding-similarity match within the same entity type (spec §4.8
    /// step 2, second resolution tier).
    async fn find_similar(
        &self,
        scope: &Scope,
        entity_type: &str,
        embedding: &[f32],
        threshold: f32,
    ) -> EngramResult<Vec<ScoredEntity>>;

    async fn add_alias(&self, scope: &Scope, id: Uuid, alias: &str) -> EngramResult<()>;

    async fn record_mention(&self, scope: &Scope, mention: &EntityMention) -> EngramResult<()>;

    /// Every memory id that has previously mentioned this entity, used to
    /// create entity-link edges to "every other memory sharing this
    /// entity" (spec §4.8 step 4).
    async fn memories_mentioning(&self, scope: &Scope, entity_id: Uuid) -> EngramResult<Vec<(Uuid, String)>>;
}
