use uuid::Uuid;

use crate::errors::EngramResult;
use crate::memory::{Association, AssociationDirection, NodeKind, RelationKind, Scope};

/// Persistence contract for the association graph (spec §4.2, "Graph
/// store" / "Association" bullets — modeled as one edge table, since the
/// spec describes a single edge shape under both headings).
#[allow(async_fn_in_trait)]
pub trait GraphStore: Send + Sync {
    async fn create_edge(&self, edge: &Association) -> EngramResult<()>;
    async fn get_edge(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Association>>;
    async fn delete_edge(&self, scope: &Scope, id: Uuid) -> EngramResult<()>;

    async fn get_neighbors(
        &self,
        scope: &Scope,
        node_type: NodeKind,
        node_id: Uuid,
        direction: AssociationDirection,
        relation_filter: Option<&[RelationKind]>,
    ) -> EngramResult<Vec<Association>>;

    async fn record_traversal(&self, scope: &Scope, id: Uuid, boost: f32) -> EngramResult<()>;

    /// Decay all edge strengths by a small amount per sweep; edges below
    /// the pruning floor are removed by a subsequent `prune` call.
    async fn apply_edge_decay(&self, scope: &Scope, decay: f32) -> EngramResult<usize>;

    /// Remove edges with strength below `min_strength`.
    async fn prune(&self, scope: &Scope, min_strength: f32) -> EngramResult<usize>;
}
