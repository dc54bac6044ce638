use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{Entity, EntityMention, Scope};
use engram_core::traits::{EntityStore, ScoredEntity};

use crate::store::{to_storage_err, Store};

use super::{embedding_from_text, embedding_to_text, parse_dt, OptionalRow};

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, name, entity_type, aliases, embedding, created_at";

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<EngramResult<Entity>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let name: String = row.get(3)?;
    let entity_type: String = row.get(4)?;
    let aliases: String = row.get(5)?;
    let embedding: Option<String> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok((|| -> EngramResult<Entity> {
        Ok(Entity {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            name,
            entity_type,
            aliases: serde_json::from_str(&aliases).map_err(to_storage_err)?,
            embedding: embedding_from_text(embedding),
            created_at: parse_dt(&created_at)?,
        })
    })())
}

fn load_by_type(conn: &Connection, scope: &Scope, entity_type: &str) -> EngramResult<Vec<Entity>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM entities WHERE tenant_id = ?1 AND agent_id = ?2 AND entity_type = ?3"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![scope.tenant_id, scope.agent_id, entity_type], row_to_entity)
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
}

fn load_all(conn: &Connection, scope: &Scope) -> EngramResult<Vec<Entity>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {SELECT_COLUMNS} FROM entities WHERE tenant_id = ?1 AND agent_id = ?2"))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![scope.tenant_id, scope.agent_id], row_to_entity)
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
}

impl EntityStore for Store {
    async fn create(&self, entity: &Entity) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO entities ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)"),
            params![
                entity.id.to_string(),
                entity.scope.tenant_id,
                entity.scope.agent_id,
                entity.name,
                entity.entity_type,
                serde_json::to_string(&entity.aliases).unwrap_or_default(),
                embedding_to_text(&entity.embedding),
                entity.created_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Entity>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM entities WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
            ))
            .map_err(to_storage_err)?;
        stmt.query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_entity)
            .optional()
            .map_err(to_storage_err)?
            .transpose()
    }

    async fn find_by_name(&self, scope: &Scope, entity_type: &str, name: &str) -> EngramResult<Option<Entity>> {
        let conn = self.conn.lock().await;
        let entities = load_by_type(&conn, scope, entity_type)?;
        let needle = name.to_lowercase();
        Ok(entities
            .into_iter()
            .find(|e| e.name.to_lowercase() == needle || e.aliases.iter().any(|a| a.to_lowercase() == needle)))
    }

    async fn find_all_by_name(&self, scope: &Scope, name: &str) -> EngramResult<Vec<Entity>> {
        let conn = self.conn.lock().await;
        let entities = load_all(&conn, scope)?;
        let needle = name.to_lowercase();
        Ok(entities
            .into_iter()
            .filter(|e| e.name.to_lowercase() == needle || e.aliases.iter().any(|a| a.to_lowercase() == needle))
            .collect())
    }

    async fn find_similar(
        &self,
        scope: &Scope,
        entity_type: &str,
        embedding: &[f32],
        threshold: f32,
    ) -> EngramResult<Vec<ScoredEntity>> {
        let conn = self.conn.lock().await;
        let entities = load_by_type(&conn, scope, entity_type)?;
        let mut scored: Vec<ScoredEntity> = entities
            .into_iter()
            .filter_map(|e| {
                let similarity = cosine_similarity(embedding, e.embedding.as_deref().unwrap_or(&[]));
                (similarity >= threshold).then_some(ScoredEntity { entity: e, similarity })
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    async fn add_alias(&self, scope: &Scope, id: Uuid, alias: &str) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM entities WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
            ))
            .map_err(to_storage_err)?;
        let entity = stmt
            .query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_entity)
            .optional()
            .map_err(to_storage_err)?
            .transpose()?;
        let Some(mut entity) = entity else { return Ok(()) };
        if !entity.aliases.iter().any(|a| a == alias) {
            entity.aliases.push(alias.to_string());
        }
        conn.execute(
            "UPDATE entities SET aliases = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![
                serde_json::to_string(&entity.aliases).unwrap_or_default(),
                id.to_string(),
                scope.tenant_id,
                scope.agent_id,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn record_mention(&self, scope: &Scope, mention: &EntityMention) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO entity_mentions (entity_id, memory_id, tenant_id, agent_id, role, created_at)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                mention.entity_id.to_string(),
                mention.memory_id.to_string(),
                scope.tenant_id,
                scope.agent_id,
                mention.role,
                mention.created_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn memories_mentioning(&self, scope: &Scope, entity_id: Uuid) -> EngramResult<Vec<(Uuid, String)>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT memory_id, role FROM entity_mentions
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND entity_id = ?3",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id, entity_id.to_string()], |row| {
                let memory_id: String = row.get(0)?;
                let role: String = row.get(1)?;
                Ok((memory_id, role))
            })
            .map_err(to_storage_err)?;

        let mut out = Vec::new();
        for row in rows {
            let (memory_id, role) = row.map_err(to_storage_err)?;
            out.push((Uuid::parse_str(&memory_id).map_err(|e| to_storage_err(e.to_string()))?, role));
        }
        Ok(out)
    }
}
