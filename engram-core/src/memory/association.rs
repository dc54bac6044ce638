use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// The entity family an association endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Memory,
    Episode,
    Procedure,
    Schema,
    Entity,
}

/// Typed relation kinds carried by an association edge (spec §3/§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Thematic,
    Causal,
    EntityLink,
    Derived,
    Contradicts,
}

/// Direction to traverse an association graph from a node (spec §4.2
/// `get_neighbors(direction, ...)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationDirection {
    Outgoing,
    Incoming,
    Both,
}

/// A graph edge between two memory-family entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub id: Uuid,
    pub scope: Scope,
    pub source_type: NodeKind,
    pub source_id: Uuid,
    pub target_type: NodeKind,
    pub target_id: Uuid,
    pub relation: RelationKind,
    pub strength: f32,
    pub traversal_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_traversed_at: Option<DateTime<Utc>>,
}

impl Association {
    pub fn new(
        scope: Scope,
        source_type: NodeKind,
        source_id: Uuid,
        target_type: NodeKind,
        target_id: Uuid,
        relation: RelationKind,
        strength: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope,
            source_type,
            source_id,
            target_type,
            target_id,
            relation,
            strength: strength.clamp(0.0, 1.0),
            traversal_count: 0,
            created_at: Utc::now(),
            last_traversed_at: None,
        }
    }

    /// Record one traversal, boosting strength by `boost` (spec §4.7:
    /// "record traversal (+0.03 strength boost)").
    pub fn record_traversal(&mut self, boost: f32) {
        self.traversal_count += 1;
        self.strength = (self.strength + boost).clamp(0.0, 1.0);
        self.last_traversed_at = Some(Utc::now());
    }
}
