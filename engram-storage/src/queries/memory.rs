use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::confidence::Tier;
use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{Memory, MemoryType, Provenance, Scope};
use engram_core::traits::{MemoryStore, RecallOptions, ScoredMemory};

use crate::store::{to_storage_err, Store};

use super::{embedding_from_text, embedding_to_text, parse_dt, OptionalRow};

fn row_to_memory(row: &Row<'_>) -> rusqlite::Result<EngramResult<Memory>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let memory_type: String = row.get(3)?;
    let content: String = row.get(4)?;
    let embedding: Option<String> = row.get(5)?;
    let confidence: f64 = row.get(6)?;
    let reinforcement_count: u32 = row.get(7)?;
    let decay_rate: f32 = row.get(8)?;
    let provenance: String = row.get(9)?;
    let source: String = row.get(10)?;
    let last_accessed_at: String = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;
    let needs_review: bool = row.get(14)?;
    let archived: bool = row.get(15)?;
    let expires_at: Option<String> = row.get(16)?;

    Ok((|| -> EngramResult<Memory> {
        Ok(Memory {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            memory_type: MemoryType::parse(&memory_type)
                .ok_or_else(|| EngramError::InvalidType { type_name: memory_type })?,
            content,
            embedding: embedding_from_text(embedding),
            confidence,
            reinforcement_count,
            decay_rate,
            provenance: parse_provenance(&provenance)?,
            source,
            last_accessed_at: parse_dt(&last_accessed_at)?,
            created_at: parse_dt(&created_at)?,
            updated_at: parse_dt(&updated_at)?,
            needs_review,
            archived,
            expires_at: expires_at.as_deref().map(parse_dt).transpose()?,
        })
    })())
}

fn parse_provenance(s: &str) -> EngramResult<Provenance> {
    match s {
        "user" => Ok(Provenance::User),
        "tool" => Ok(Provenance::Tool),
        "agent" => Ok(Provenance::Agent),
        "derived" => Ok(Provenance::Derived),
        "inferred" => Ok(Provenance::Inferred),
        other => Err(to_storage_err(format!("unknown provenance '{other}'"))),
    }
}

fn provenance_str(p: Provenance) -> &'static str {
    match p {
        Provenance::User => "user",
        Provenance::Tool => "tool",
        Provenance::Agent => "agent",
        Provenance::Derived => "derived",
        Provenance::Inferred => "inferred",
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, memory_type, content, embedding,
     confidence, reinforcement_count, decay_rate, provenance, source,
     last_accessed_at, created_at, updated_at, needs_review, archived, expires_at";

fn insert(conn: &Connection, memory: &Memory) -> EngramResult<()> {
    conn.execute(
        "INSERT INTO memories (
            id, tenant_id, agent_id, memory_type, content, embedding,
            confidence, reinforcement_count, decay_rate, provenance, source,
            last_accessed_at, created_at, updated_at, needs_review, archived, expires_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
        params![
            memory.id.to_string(),
            memory.scope.tenant_id,
            memory.scope.agent_id,
            memory.memory_type.as_str(),
            memory.content,
            embedding_to_text(&memory.embedding),
            memory.confidence,
            memory.reinforcement_count,
            memory.decay_rate,
            provenance_str(memory.provenance),
            memory.source,
            memory.last_accessed_at.to_rfc3339(),
            memory.created_at.to_rfc3339(),
            memory.updated_at.to_rfc3339(),
            memory.needs_review,
            memory.archived,
            memory.expires_at.map(|t| t.to_rfc3339()),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

fn get(conn: &Connection, scope: &Scope, id: Uuid) -> EngramResult<Option<Memory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM memories WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
        ))
        .map_err(to_storage_err)?;
    let row = stmt
        .query_row(
            params![id.to_string(), scope.tenant_id, scope.agent_id],
            row_to_memory,
        )
        .optional()
        .map_err(to_storage_err)?;
    row.transpose()
}

/// Cosine similarity between two equal-length embeddings.
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

fn load_candidates(conn: &Connection, scope: &Scope) -> EngramResult<Vec<Memory>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM memories WHERE tenant_id = ?1 AND agent_id = ?2 AND archived = 0"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![scope.tenant_id, scope.agent_id], row_to_memory)
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(to_storage_err)?
        .into_iter()
        .collect()
}

impl MemoryStore for Store {
    async fn create(&self, memory: &Memory) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        insert(&conn, memory)
    }

    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Memory>> {
        let conn = self.conn.lock().await;
        get(&conn, scope, id)
    }

    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM memories WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            params![id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn recall(
        &self,
        scope: &Scope,
        embedding: &[f32],
        opts: &RecallOptions,
    ) -> EngramResult<Vec<ScoredMemory>> {
        let conn = self.conn.lock().await;
        let candidates = load_candidates(&conn, scope)?;
        let tiers: std::collections::HashSet<_> = opts.include_tiers.iter().copied().collect();

        let mut scored: Vec<ScoredMemory> = candidates
            .into_iter()
            .filter(|m| m.confidence >= opts.min_confidence)
            .filter(|m| tiers.is_empty() || tiers.contains(&m.tier()))
            .filter(|m| opts.memory_type.map(|t| t == m.memory_type).unwrap_or(true))
            .filter_map(|m| {
                let similarity = cosine_similarity(embedding, m.embedding.as_deref().unwrap_or(&[]));
                Some(ScoredMemory { memory: m, similarity })
            })
            .collect();

        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(opts.top_k);
        Ok(scored)
    }

    async fn find_similar(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        exclude_id: Option<Uuid>,
    ) -> EngramResult<Vec<ScoredMemory>> {
        let conn = self.conn.lock().await;
        let candidates = load_candidates(&conn, scope)?;
        let mut scored: Vec<ScoredMemory> = candidates
            .into_iter()
            .filter(|m| Some(m.id) != exclude_id)
            .filter_map(|m| {
                let similarity = cosine_similarity(embedding, m.embedding.as_deref().unwrap_or(&[]));
                (similarity >= threshold).then_some(ScoredMemory { memory: m, similarity })
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored)
    }

    async fn update_confidence(&self, scope: &Scope, id: Uuid, confidence: f64) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let rows = conn
            .execute(
                "UPDATE memories SET confidence = ?1, updated_at = ?2
                 WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
                params![
                    confidence,
                    chrono::Utc::now().to_rfc3339(),
                    id.to_string(),
                    scope.tenant_id,
                    scope.agent_id,
                ],
            )
            .map_err(to_storage_err)?;
        if rows == 0 {
            return Err(EngramError::MemoryNotFound { id: id.to_string() });
        }
        Ok(())
    }

    async fn update_reinforcement(
        &self,
        scope: &Scope,
        id: Uuid,
        reinforcement_count: u32,
    ) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE memories SET reinforcement_count = ?1, updated_at = ?2
             WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![
                reinforcement_count,
                chrono::Utc::now().to_rfc3339(),
                id.to_string(),
                scope.tenant_id,
                scope.agent_id,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn increment_access_and_boost(&self, scope: &Scope, id: Uuid, boost: f64) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let existing = get(&conn, scope, id)?.ok_or_else(|| EngramError::MemoryNotFound { id: id.to_string() })?;
        let new_confidence = engram_core::confidence::apply_log_odds(existing.confidence, boost);
        conn.execute(
            "UPDATE memories SET confidence = ?1, last_accessed_at = ?2, updated_at = ?2
             WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![
                new_confidence,
                chrono::Utc::now().to_rfc3339(),
                id.to_string(),
                scope.tenant_id,
                scope.agent_id,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn list_by_agent_for_decay(&self, scope: &Scope) -> EngramResult<Vec<Memory>> {
        let conn = self.conn.lock().await;
        load_candidates(&conn, scope)
    }

    async fn list_oldest_by_type(
        &self,
        scope: &Scope,
        memory_type: MemoryType,
        limit: usize,
    ) -> EngramResult<Vec<Memory>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM memories
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_type = ?3 AND archived = 0
                 ORDER BY created_at ASC LIMIT ?4"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(
                params![scope.tenant_id, scope.agent_id, memory_type.as_str(), limit as i64],
                row_to_memory,
            )
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(to_storage_err)?
            .into_iter()
            .collect()
    }

    async fn count_by_type(&self, scope: &Scope, memory_type: MemoryType) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_type = ?3 AND archived = 0",
                params![scope.tenant_id, scope.agent_id, memory_type.as_str()],
                |row| row.get(0),
            )
            .map_err(to_storage_err)?;
        Ok(count as usize)
    }

    async fn delete_expired(&self, scope: &Scope) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let affected = conn
            .execute(
                "DELETE FROM memories WHERE tenant_id = ?1 AND agent_id = ?2
                 AND expires_at IS NOT NULL AND expires_at <= ?3",
                params![scope.tenant_id, scope.agent_id, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(to_storage_err)?;
        Ok(affected)
    }

    async fn delete_by_retention(
        &self,
        scope: &Scope,
        memory_type: MemoryType,
        retention_days: u32,
    ) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days as i64);
        let affected = conn
            .execute(
                "DELETE FROM memories WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_type = ?3
                 AND created_at <= ?4",
                params![scope.tenant_id, scope.agent_id, memory_type.as_str(), cutoff.to_rfc3339()],
            )
            .map_err(to_storage_err)?;
        Ok(affected)
    }

    async fn archive(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE memories SET archived = 1, updated_at = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn set_needs_review(&self, scope: &Scope, id: Uuid, needs_review: bool) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE memories SET needs_review = ?1, updated_at = ?2 WHERE id = ?3 AND tenant_id = ?4 AND agent_id = ?5",
            params![needs_review, chrono::Utc::now().to_rfc3339(), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get_by_tier(&self, scope: &Scope, tier: Tier) -> EngramResult<Vec<Memory>> {
        let conn = self.conn.lock().await;
        let candidates = load_candidates(&conn, scope)?;
        Ok(candidates.into_iter().filter(|m| m.tier() == tier).collect())
    }

    async fn tier_counts(&self, scope: &Scope) -> EngramResult<Vec<(Tier, usize)>> {
        let conn = self.conn.lock().await;
        let candidates = load_candidates(&conn, scope)?;
        let mut counts = [0usize; 4];
        for m in &candidates {
            counts[tier_index(m.tier())] += 1;
        }
        Ok(vec![
            (Tier::Hot, counts[tier_index(Tier::Hot)]),
            (Tier::Warm, counts[tier_index(Tier::Warm)]),
            (Tier::Cold, counts[tier_index(Tier::Cold)]),
            (Tier::Archive, counts[tier_index(Tier::Archive)]),
        ])
    }

    async fn list_distinct_agent_ids(&self, tenant_id: &str) -> EngramResult<Vec<String>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT DISTINCT agent_id FROM memories WHERE tenant_id = ?1")
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![tenant_id], |row| row.get::<_, String>(0))
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
    }
}

fn tier_index(tier: Tier) -> usize {
    match tier {
        Tier::Hot => 0,
        Tier::Warm => 1,
        Tier::Cold => 2,
        Tier::Archive => 3,
    }
}
