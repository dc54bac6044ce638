use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// A resolved entity mentioned across one or more memories (spec §4.8
/// "entity resolution"). Not named as its own store in spec §4.2, but
/// required for the graph builder's resolve/mention/link pipeline — see
/// DESIGN.md "Entity store" for the grounding of this addition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: Uuid,
    pub scope: Scope,
    pub name: String,
    pub entity_type: String,
    pub aliases: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(scope: Scope, name: String, entity_type: String, embedding: Option<Vec<f32>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            name,
            entity_type,
            aliases: Vec::new(),
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// A mention of an entity within a memory, carrying the role it plays
/// there (spec §4.8 step 3, e.g. "subject", "object").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMention {
    pub entity_id: Uuid,
    pub memory_id: Uuid,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl EntityMention {
    pub fn new(entity_id: Uuid, memory_id: Uuid, role: String) -> Self {
        Self {
            entity_id,
            memory_id,
            role,
            created_at: Utc::now(),
        }
    }

    /// Role weight used by entity-link edge strength = geometric mean of
    /// the two mentions' role weights (spec §4.8 step 4). Unnamed roles
    /// default to the "mentioned" weight.
    pub fn role_weight(&self) -> f32 {
        match self.role.as_str() {
            "subject" => 1.0,
            "object" => 0.8,
            _ => 0.6,
        }
    }
}
