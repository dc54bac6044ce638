use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{Association, AssociationDirection, NodeKind, RelationKind, Scope};
use engram_core::traits::GraphStore;

use crate::store::{to_storage_err, Store};

use super::{parse_dt, OptionalRow};

fn node_kind_str(k: NodeKind) -> &'static str {
    match k {
        NodeKind::Memory => "memory",
        NodeKind::Episode => "episode",
        NodeKind::Procedure => "procedure",
        NodeKind::Schema => "schema",
        NodeKind::Entity => "entity",
    }
}

fn parse_node_kind(s: &str) -> EngramResult<NodeKind> {
    match s {
        "memory" => Ok(NodeKind::Memory),
        "episode" => Ok(NodeKind::Episode),
        "procedure" => Ok(NodeKind::Procedure),
        "schema" => Ok(NodeKind::Schema),
        "entity" => Ok(NodeKind::Entity),
        other => Err(to_storage_err(format!("unknown node_type '{other}'"))),
    }
}

fn relation_str(r: RelationKind) -> &'static str {
    match r {
        RelationKind::Thematic => "thematic",
        RelationKind::Causal => "causal",
        RelationKind::EntityLink => "entity_link",
        RelationKind::Derived => "derived",
        RelationKind::Contradicts => "contradicts",
    }
}

fn parse_relation(s: &str) -> EngramResult<RelationKind> {
    match s {
        "thematic" => Ok(RelationKind::Thematic),
        "causal" => Ok(RelationKind::Causal),
        "entity_link" => Ok(RelationKind::EntityLink),
        "derived" => Ok(RelationKind::Derived),
        "contradicts" => Ok(RelationKind::Contradicts),
        other => Err(to_storage_err(format!("unknown relation '{other}'"))),
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, source_type, source_id, target_type,
     target_id, relation, strength, traversal_count, created_at, last_traversed_at";

fn row_to_association(row: &Row<'_>) -> rusqlite::Result<EngramResult<Association>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let source_type: String = row.get(3)?;
    let source_id: String = row.get(4)?;
    let target_type: String = row.get(5)?;
    let target_id: String = row.get(6)?;
    let relation: String = row.get(7)?;
    let strength: f32 = row.get(8)?;
    let traversal_count: u32 = row.get(9)?;
    let created_at: String = row.get(10)?;
    let last_traversed_at: Option<String> = row.get(11)?;

    Ok((|| -> EngramResult<Association> {
        Ok(Association {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            source_type: parse_node_kind(&source_type)?,
            source_id: Uuid::parse_str(&source_id).map_err(|e| to_storage_err(e.to_string()))?,
            target_type: parse_node_kind(&target_type)?,
            target_id: Uuid::parse_str(&target_id).map_err(|e| to_storage_err(e.to_string()))?,
            relation: parse_relation(&relation)?,
            strength,
            traversal_count,
            created_at: parse_dt(&created_at)?,
            last_traversed_at: last_traversed_at.as_deref().map(parse_dt).transpose()?,
        })
    })())
}

fn get(conn: &Connection, scope: &Scope, id: Uuid) -> EngramResult<Option<Association>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM associations WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
        ))
        .map_err(to_storage_err)?;
    stmt.query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_association)
        .optional()
        .map_err(to_storage_err)?
        .transpose()
}

impl GraphStore for Store {
    async fn create_edge(&self, edge: &Association) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO associations ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)"),
            params![
                edge.id.to_string(),
                edge.scope.tenant_id,
                edge.scope.agent_id,
                node_kind_str(edge.source_type),
                edge.source_id.to_string(),
                node_kind_str(edge.target_type),
                edge.target_id.to_string(),
                relation_str(edge.relation),
                edge.strength,
                edge.traversal_count,
                edge.created_at.to_rfc3339(),
                edge.last_traversed_at.map(|t| t.to_rfc3339()),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get_edge(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Association>> {
        let conn = self.conn.lock().await;
        get(&conn, scope, id)
    }

    async fn delete_edge(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM associations WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            params![id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get_neighbors(
        &self,
        scope: &Scope,
        node_type: NodeKind,
        node_id: Uuid,
        direction: AssociationDirection,
        relation_filter: Option<&[RelationKind]>,
    ) -> EngramResult<Vec<Association>> {
        let conn = self.conn.lock().await;

        let mut edges = Vec::new();
        if matches!(direction, AssociationDirection::Outgoing | AssociationDirection::Both) {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM associations
                     WHERE tenant_id = ?1 AND agent_id = ?2 AND source_type = ?3 AND source_id = ?4"
                ))
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map(
                    params![scope.tenant_id, scope.agent_id, node_kind_str(node_type), node_id.to_string()],
                    row_to_association,
                )
                .map_err(to_storage_err)?;
            for row in rows {
                edges.push(row.map_err(to_storage_err)??);
            }
        }
        if matches!(direction, AssociationDirection::Incoming | AssociationDirection::Both) {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM associations
                     WHERE tenant_id = ?1 AND agent_id = ?2 AND target_type = ?3 AND target_id = ?4"
                ))
                .map_err(to_storage_err)?;
            let rows = stmt
                .query_map(
                    params![scope.tenant_id, scope.agent_id, node_kind_str(node_type), node_id.to_string()],
                    row_to_association,
                )
                .map_err(to_storage_err)?;
            for row in rows {
                edges.push(row.map_err(to_storage_err)??);
            }
        }

        if let Some(filter) = relation_filter {
            edges.retain(|e| filter.contains(&e.relation));
        }
        Ok(edges)
    }

    async fn record_traversal(&self, scope: &Scope, id: Uuid, boost: f32) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let edge = get(&conn, scope, id)?
            .ok_or_else(|| to_storage_err(format!("association {id} not found")))?;
        let new_strength = (edge.strength + boost).clamp(0.0, 1.0);
        conn.execute(
            "UPDATE associations SET strength = ?1, traversal_count = traversal_count + 1, last_traversed_at = ?2
             WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![new_strength, chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn apply_edge_decay(&self, scope: &Scope, decay: f32) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "UPDATE associations SET strength = MAX(0.0, strength - ?1) WHERE tenant_id = ?2 AND agent_id = ?3",
                params![decay, scope.tenant_id, scope.agent_id],
            )
            .map_err(to_storage_err)?;
        Ok(affected)
    }

    async fn prune(&self, scope: &Scope, min_strength: f32) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "DELETE FROM associations WHERE tenant_id = ?1 AND agent_id = ?2 AND strength < ?3",
                params![scope.tenant_id, scope.agent_id, min_strength],
            )
            .map_err(to_storage_err)?;
        Ok(affected)
    }
}
