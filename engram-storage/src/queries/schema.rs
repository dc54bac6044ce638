use std::collections::HashMap;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Schema, Scope};
use engram_core::traits::SchemaStore;

use crate::store::{to_storage_err, Store};

use super::{embedding_from_text, embedding_to_text, parse_dt, OptionalRow};

fn uuid_vec_to_json(v: &[Uuid]) -> String {
    serde_json::to_string(&v.iter().map(Uuid::to_string).collect::<Vec<_>>()).unwrap_or_default()
}

fn uuid_vec_from_json(s: &str) -> EngramResult<Vec<Uuid>> {
    let strs: Vec<String> = serde_json::from_str(s).map_err(to_storage_err)?;
    strs.iter()
        .map(|s| Uuid::parse_str(s).map_err(|e| to_storage_err(e.to_string())))
        .collect()
}

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, schema_type, name, description, attributes,
     applicable_contexts, evidence_memories, evidence_episodes, evidence_count, confidence,
     contradiction_count, last_validated_at, embedding, created_at, updated_at";

fn row_to_schema(row: &Row<'_>) -> rusqlite::Result<EngramResult<Schema>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let schema_type: String = row.get(3)?;
    let name: String = row.get(4)?;
    let description: String = row.get(5)?;
    let attributes: String = row.get(6)?;
    let applicable_contexts: String = row.get(7)?;
    let evidence_memories: String = row.get(8)?;
    let evidence_episodes: String = row.get(9)?;
    let evidence_count: i64 = row.get(10)?;
    let confidence: f64 = row.get(11)?;
    let contradiction_count: u32 = row.get(12)?;
    let last_validated_at: Option<String> = row.get(13)?;
    let embedding: Option<String> = row.get(14)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;

    Ok((|| -> EngramResult<Schema> {
        Ok(Schema {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            schema_type,
            name,
            description,
            attributes: serde_json::from_str::<HashMap<String, String>>(&attributes)
                .map_err(to_storage_err)?,
            applicable_contexts: serde_json::from_str(&applicable_contexts).map_err(to_storage_err)?,
            evidence_memories: uuid_vec_from_json(&evidence_memories)?,
            evidence_episodes: uuid_vec_from_json(&evidence_episodes)?,
            evidence_count: evidence_count as usize,
            confidence,
            contradiction_count,
            last_validated_at: last_validated_at.as_deref().map(parse_dt).transpose()?,
            embedding: embedding_from_text(embedding),
            created_at: parse_dt(&created_at)?,
            updated_at: parse_dt(&updated_at)?,
        })
    })())
}

fn get(conn: &Connection, scope: &Scope, id: Uuid) -> EngramResult<Option<Schema>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM schemas WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
        ))
        .map_err(to_storage_err)?;
    stmt.query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_schema)
        .optional()
        .map_err(to_storage_err)?
        .transpose()
}

impl SchemaStore for Store {
    async fn create(&self, schema: &Schema) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO schemas ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)"),
            params![
                schema.id.to_string(),
                schema.scope.tenant_id,
                schema.scope.agent_id,
                schema.schema_type,
                schema.name,
                schema.description,
                serde_json::to_string(&schema.attributes).unwrap_or_default(),
                serde_json::to_string(&schema.applicable_contexts).unwrap_or_default(),
                uuid_vec_to_json(&schema.evidence_memories),
                uuid_vec_to_json(&schema.evidence_episodes),
                schema.evidence_count as i64,
                schema.confidence,
                schema.contradiction_count,
                schema.last_validated_at.map(|t| t.to_rfc3339()),
                embedding_to_text(&schema.embedding),
                schema.created_at.to_rfc3339(),
                schema.updated_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Schema>> {
        let conn = self.conn.lock().await;
        get(&conn, scope, id)
    }

    async fn get_by_name(
        &self,
        scope: &Scope,
        schema_type: &str,
        name: &str,
    ) -> EngramResult<Option<Schema>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM schemas
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND schema_type = ?3 AND name = ?4"
            ))
            .map_err(to_storage_err)?;
        stmt.query_row(
            params![scope.tenant_id, scope.agent_id, schema_type, name],
            row_to_schema,
        )
        .optional()
        .map_err(to_storage_err)?
        .transpose()
    }

    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Schema>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM schemas WHERE tenant_id = ?1 AND agent_id = ?2"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id], row_to_schema)
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }

    async fn add_evidence(
        &self,
        scope: &Scope,
        id: Uuid,
        memory_ids: &[Uuid],
        episode_ids: &[Uuid],
    ) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let schema = get(&conn, scope, id)?.ok_or_else(|| EngramError::SchemaNotFound { id: id.to_string() })?;

        let mut memories = schema.evidence_memories;
        for m in memory_ids {
            if !memories.contains(m) {
                memories.push(*m);
            }
        }
        let mut episodes = schema.evidence_episodes;
        for e in episode_ids {
            if !episodes.contains(e) {
                episodes.push(*e);
            }
        }
        let count = memories.len() + episodes.len();

        conn.execute(
            "UPDATE schemas SET evidence_memories = ?1, evidence_episodes = ?2, evidence_count = ?3, updated_at = ?4
             WHERE id = ?5 AND tenant_id = ?6 AND agent_id = ?7",
            params![
                uuid_vec_to_json(&memories),
                uuid_vec_to_json(&episodes),
                count as i64,
                chrono::Utc::now().to_rfc3339(),
                id.to_string(),
                scope.tenant_id,
                scope.agent_id,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn record_contradiction(&self, scope: &Scope, id: Uuid, penalty: f64) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let schema = get(&conn, scope, id)?.ok_or_else(|| EngramError::SchemaNotFound { id: id.to_string() })?;
        let new_confidence = (schema.confidence - penalty).max(engram_core::confidence::MIN_CONF);
        conn.execute(
            "UPDATE schemas SET confidence = ?1, contradiction_count = contradiction_count + 1, updated_at = ?2
             WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![new_confidence, chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn update_confidence(&self, scope: &Scope, id: Uuid, confidence: f64) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE schemas SET confidence = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![confidence, chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn record_validation(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE schemas SET last_validated_at = ?1, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }
}
