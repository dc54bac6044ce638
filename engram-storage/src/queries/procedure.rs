use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Procedure, Scope};
use engram_core::traits::{ProcedureStore, ScoredProcedure};

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

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, trigger_pattern, trigger_keywords,
     trigger_embedding, action_template, action_type, use_count, success_count, failure_count,
     confidence, memory_strength, last_used_at, last_verified_at, derived_from_episodes,
     archived, created_at, updated_at";

fn row_to_procedure(row: &Row<'_>) -> rusqlite::Result<EngramResult<Procedure>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let trigger_pattern: String = row.get(3)?;
    let trigger_keywords: String = row.get(4)?;
    let trigger_embedding: Option<String> = row.get(5)?;
    let action_template: String = row.get(6)?;
    let action_type: String = row.get(7)?;
    let use_count: u32 = row.get(8)?;
    let success_count: u32 = row.get(9)?;
    let failure_count: u32 = row.get(10)?;
    let confidence: f64 = row.get(11)?;
    let memory_strength: f32 = row.get(12)?;
    let last_used_at: Option<String> = row.get(13)?;
    let last_verified_at: Option<String> = row.get(14)?;
    let derived_from_episodes: String = row.get(15)?;
    let archived: bool = row.get(16)?;
    let created_at: String = row.get(17)?;
    let updated_at: String = row.get(18)?;

    Ok((|| -> EngramResult<Procedure> {
        Ok(Procedure {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            trigger_pattern,
            trigger_keywords: serde_json::from_str(&trigger_keywords).map_err(to_storage_err)?,
            trigger_embedding: embedding_from_text(trigger_embedding),
            action_template,
            action_type,
            use_count,
            success_count,
            failure_count,
            confidence,
            memory_strength,
            last_used_at: last_used_at.as_deref().map(parse_dt).transpose()?,
            last_verified_at: last_verified_at.as_deref().map(parse_dt).transpose()?,
            derived_from_episodes: uuid_vec_from_json(&derived_from_episodes)?,
            archived,
            created_at: parse_dt(&created_at)?,
            updated_at: parse_dt(&updated_at)?,
        })
    })())
}

fn get(conn: &Connection, scope: &Scope, id: Uuid) -> EngramResult<Option<Procedure>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM procedures WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
        ))
        .map_err(to_storage_err)?;
    stmt.query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_procedure)
        .optional()
        .map_err(to_storage_err)?
        .transpose()
}

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

fn load_all(conn: &Connection, scope: &Scope) -> EngramResult<Vec<Procedure>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM procedures WHERE tenant_id = ?1 AND agent_id = ?2 AND archived = 0"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![scope.tenant_id, scope.agent_id], row_to_procedure)
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
}

impl ProcedureStore for Store {
    async fn create(&self, procedure: &Procedure) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            &format!("INSERT INTO procedures ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)"),
            params![
                procedure.id.to_string(),
                procedure.scope.tenant_id,
                procedure.scope.agent_id,
                procedure.trigger_pattern,
                serde_json::to_string(&procedure.trigger_keywords).unwrap_or_default(),
                embedding_to_text(&procedure.trigger_embedding),
                procedure.action_template,
                procedure.action_type,
                procedure.use_count,
                procedure.success_count,
                procedure.failure_count,
                procedure.confidence,
                procedure.memory_strength,
                procedure.last_used_at.map(|t| t.to_rfc3339()),
                procedure.last_verified_at.map(|t| t.to_rfc3339()),
                uuid_vec_to_json(&procedure.derived_from_episodes),
                procedure.archived,
                procedure.created_at.to_rfc3339(),
                procedure.updated_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Procedure>> {
        let conn = self.conn.lock().await;
        get(&conn, scope, id)
    }

    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM procedures WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            params![id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Procedure>> {
        let conn = self.conn.lock().await;
        load_all(&conn, scope)
    }

    async fn find_by_trigger_similarity(
        &self,
        scope: &Scope,
        trigger_embedding: &[f32],
        threshold: f32,
    ) -> EngramResult<Vec<ScoredProcedure>> {
        let conn = self.conn.lock().await;
        let mut scored: Vec<ScoredProcedure> = load_all(&conn, scope)?
            .into_iter()
            .filter_map(|p| {
                let similarity =
                    cosine_similarity(trigger_embedding, p.trigger_embedding.as_deref().unwrap_or(&[]));
                (similarity >= threshold).then_some(ScoredProcedure { procedure: p, similarity })
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    async fn find_by_keywords(
        &self,
        scope: &Scope,
        keywords: &[String],
        top_k: usize,
    ) -> EngramResult<Vec<Procedure>> {
        let conn = self.conn.lock().await;
        let wanted: std::collections::HashSet<String> =
            keywords.iter().map(|k| k.to_lowercase()).collect();
        let mut scored: Vec<(usize, Procedure)> = load_all(&conn, scope)?
            .into_iter()
            .map(|p| {
                let hits = p
                    .trigger_keywords
                    .iter()
                    .filter(|k| wanted.contains(&k.to_lowercase()))
                    .count();
                (hits, p)
            })
            .filter(|(hits, _)| *hits > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(top_k);
        Ok(scored.into_iter().map(|(_, p)| p).collect())
    }

    async fn reinforce(&self, scope: &Scope, id: Uuid, delta: f64, cap: f64) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let procedure = get(&conn, scope, id)?
            .ok_or_else(|| EngramError::ProcedureNotFound { id: id.to_string() })?;
        let new_confidence = (procedure.confidence + delta).min(cap);
        conn.execute(
            "UPDATE procedures SET confidence = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![new_confidence, chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn record_use(&self, scope: &Scope, id: Uuid, succeeded: bool) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let column = if succeeded { "success_count" } else { "failure_count" };
        conn.execute(
            &format!(
                "UPDATE procedures SET {column} = {column} + 1,
                 use_count = success_count + failure_count + 1,
                 last_used_at = ?1, updated_at = ?1
                 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4"
            ),
            params![chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn archive(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE procedures SET archived = 1, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn apply_decay(&self, scope: &Scope, lambda: f64) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "UPDATE procedures SET memory_strength = memory_strength * (1.0 - ?1), updated_at = ?2
                 WHERE tenant_id = ?3 AND agent_id = ?4 AND archived = 0",
                params![lambda, chrono::Utc::now().to_rfc3339(), scope.tenant_id, scope.agent_id],
            )
            .map_err(to_storage_err)?;
        Ok(affected)
    }
}
