use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use engram_core::errors::{EngramError, EngramResult};
use engram_core::memory::{ConsolidationStatus, DayOfWeek, Episode, Outcome, Scope, TimeOfDay};
use engram_core::traits::{EpisodeStore, ScoredEpisode};

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

fn outcome_str(o: Outcome) -> &'static str {
    match o {
        Outcome::Unknown => "unknown",
        Outcome::Success => "success",
        Outcome::Failure => "failure",
        Outcome::Neutral => "neutral",
    }
}

fn status_str(s: ConsolidationStatus) -> &'static str {
    match s {
        ConsolidationStatus::Raw => "raw",
        ConsolidationStatus::Processed => "processed",
        ConsolidationStatus::Abstracted => "abstracted",
        ConsolidationStatus::Archived => "archived",
    }
}

fn parse_status(s: &str) -> EngramResult<ConsolidationStatus> {
    match s {
        "raw" => Ok(ConsolidationStatus::Raw),
        "processed" => Ok(ConsolidationStatus::Processed),
        "abstracted" => Ok(ConsolidationStatus::Abstracted),
        "archived" => Ok(ConsolidationStatus::Archived),
        other => Err(to_storage_err(format!("unknown consolidation_status '{other}'"))),
    }
}

fn time_of_day_str(t: TimeOfDay) -> &'static str {
    match t {
        TimeOfDay::Morning => "morning",
        TimeOfDay::Afternoon => "afternoon",
        TimeOfDay::Evening => "evening",
        TimeOfDay::Night => "night",
    }
}

fn parse_time_of_day(s: &str) -> EngramResult<TimeOfDay> {
    match s {
        "morning" => Ok(TimeOfDay::Morning),
        "afternoon" => Ok(TimeOfDay::Afternoon),
        "evening" => Ok(TimeOfDay::Evening),
        "night" => Ok(TimeOfDay::Night),
        other => Err(to_storage_err(format!("unknown time_of_day '{other}'"))),
    }
}

fn day_of_week_str(d: DayOfWeek) -> &'static str {
    match d {
        DayOfWeek::Mon => "mon",
        DayOfWeek::Tue => "tue",
        DayOfWeek::Wed => "wed",
        DayOfWeek::Thu => "thu",
        DayOfWeek::Fri => "fri",
        DayOfWeek::Sat => "sat",
        DayOfWeek::Sun => "sun",
    }
}

fn parse_day_of_week(s: &str) -> EngramResult<DayOfWeek> {
    match s {
        "mon" => Ok(DayOfWeek::Mon),
        "tue" => Ok(DayOfWeek::Tue),
        "wed" => Ok(DayOfWeek::Wed),
        "thu" => Ok(DayOfWeek::Thu),
        "fri" => Ok(DayOfWeek::Fri),
        "sat" => Ok(DayOfWeek::Sat),
        "sun" => Ok(DayOfWeek::Sun),
        other => Err(to_storage_err(format!("unknown day_of_week '{other}'"))),
    }
}

const SELECT_COLUMNS: &str = "id, tenant_id, agent_id, raw_content, conversation_id, occurred_at,
     embedding, entities, topics, causal_links, emotional_valence, emotional_intensity,
     importance_score, outcome, consolidation_status, memory_strength, access_count,
     derived_semantic_ids, derived_procedural_ids, time_of_day, day_of_week, created_at";

fn row_to_episode(row: &Row<'_>) -> rusqlite::Result<EngramResult<Episode>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let raw_content: String = row.get(3)?;
    let conversation_id: Option<String> = row.get(4)?;
    let occurred_at: String = row.get(5)?;
    let embedding: Option<String> = row.get(6)?;
    let entities: String = row.get(7)?;
    let topics: String = row.get(8)?;
    let causal_links: String = row.get(9)?;
    let emotional_valence: f32 = row.get(10)?;
    let emotional_intensity: f32 = row.get(11)?;
    let importance_score: f32 = row.get(12)?;
    let outcome: String = row.get(13)?;
    let consolidation_status: String = row.get(14)?;
    let memory_strength: f32 = row.get(15)?;
    let access_count: u32 = row.get(16)?;
    let derived_semantic_ids: String = row.get(17)?;
    let derived_procedural_ids: String = row.get(18)?;
    let time_of_day: String = row.get(19)?;
    let day_of_week: String = row.get(20)?;
    let created_at: String = row.get(21)?;

    Ok((|| -> EngramResult<Episode> {
        Ok(Episode {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            raw_content,
            conversation_id,
            occurred_at: parse_dt(&occurred_at)?,
            embedding: embedding_from_text(embedding),
            entities: serde_json::from_str(&entities).map_err(to_storage_err)?,
            topics: serde_json::from_str(&topics).map_err(to_storage_err)?,
            causal_links: uuid_vec_from_json(&causal_links)?,
            emotional_valence,
            emotional_intensity,
            importance_score,
            outcome: Outcome::parse(&outcome)
                .ok_or_else(|| EngramError::InvalidOutcome { outcome })?,
            consolidation_status: parse_status(&consolidation_status)?,
            memory_strength,
            access_count,
            derived_semantic_ids: uuid_vec_from_json(&derived_semantic_ids)?,
            derived_procedural_ids: uuid_vec_from_json(&derived_procedural_ids)?,
            time_of_day: parse_time_of_day(&time_of_day)?,
            day_of_week: parse_day_of_week(&day_of_week)?,
            created_at: parse_dt(&created_at)?,
        })
    })())
}

fn insert(conn: &Connection, episode: &Episode) -> EngramResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO episodes ({SELECT_COLUMNS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)"
        ),
        params![
            episode.id.to_string(),
            episode.scope.tenant_id,
            episode.scope.agent_id,
            episode.raw_content,
            episode.conversation_id,
            episode.occurred_at.to_rfc3339(),
            embedding_to_text(&episode.embedding),
            serde_json::to_string(&episode.entities).unwrap_or_default(),
            serde_json::to_string(&episode.topics).unwrap_or_default(),
            uuid_vec_to_json(&episode.causal_links),
            episode.emotional_valence,
            episode.emotional_intensity,
            episode.importance_score,
            outcome_str(episode.outcome),
            status_str(episode.consolidation_status),
            episode.memory_strength,
            episode.access_count,
            uuid_vec_to_json(&episode.derived_semantic_ids),
            uuid_vec_to_json(&episode.derived_procedural_ids),
            time_of_day_str(episode.time_of_day),
            day_of_week_str(episode.day_of_week),
            episode.created_at.to_rfc3339(),
        ],
    )
    .map_err(to_storage_err)?;
    Ok(())
}

fn get(conn: &Connection, scope: &Scope, id: Uuid) -> EngramResult<Option<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM episodes WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3"
        ))
        .map_err(to_storage_err)?;
    stmt.query_row(params![id.to_string(), scope.tenant_id, scope.agent_id], row_to_episode)
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

fn load_all(conn: &Connection, scope: &Scope) -> EngramResult<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM episodes WHERE tenant_id = ?1 AND agent_id = ?2"
        ))
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map(params![scope.tenant_id, scope.agent_id], row_to_episode)
        .map_err(to_storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
}

impl EpisodeStore for Store {
    async fn create(&self, episode: &Episode) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        insert(&conn, episode)
    }

    async fn get(&self, scope: &Scope, id: Uuid) -> EngramResult<Option<Episode>> {
        let conn = self.conn.lock().await;
        get(&conn, scope, id)
    }

    async fn delete(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM episodes WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            params![id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn find_similar(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> EngramResult<Vec<ScoredEpisode>> {
        let conn = self.conn.lock().await;
        let mut scored: Vec<ScoredEpisode> = load_all(&conn, scope)?
            .into_iter()
            .filter_map(|e| {
                let similarity = cosine_similarity(embedding, e.embedding.as_deref().unwrap_or(&[]));
                (similarity >= threshold).then_some(ScoredEpisode { episode: e, similarity })
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn recall_semantic(
        &self,
        scope: &Scope,
        embedding: &[f32],
        threshold: f32,
        top_k: usize,
    ) -> EngramResult<Vec<ScoredEpisode>> {
        EpisodeStore::find_similar(self, scope, embedding, threshold, top_k).await
    }

    async fn recall_by_time_range(
        &self,
        scope: &Scope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngramResult<Vec<Episode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM episodes
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND occurred_at BETWEEN ?3 AND ?4
                 ORDER BY occurred_at ASC"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(
                params![scope.tenant_id, scope.agent_id, start.to_rfc3339(), end.to_rfc3339()],
                row_to_episode,
            )
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }

    async fn recall_by_importance(&self, scope: &Scope, min_importance: f32) -> EngramResult<Vec<Episode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM episodes
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND importance_score >= ?3
                 ORDER BY importance_score DESC"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id, min_importance], row_to_episode)
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }

    async fn get_unconsolidated(&self, scope: &Scope, limit: usize) -> EngramResult<Vec<Episode>> {
        EpisodeStore::get_by_consolidation_status(self, scope, ConsolidationStatus::Raw, limit).await
    }

    async fn get_by_consolidation_status(
        &self,
        scope: &Scope,
        status: ConsolidationStatus,
        limit: usize,
    ) -> EngramResult<Vec<Episode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM episodes
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND consolidation_status = ?3
                 ORDER BY occurred_at ASC LIMIT ?4"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(
                params![scope.tenant_id, scope.agent_id, status_str(status), limit as i64],
                row_to_episode,
            )
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }

    async fn update_consolidation_status(
        &self,
        scope: &Scope,
        id: Uuid,
        status: ConsolidationStatus,
    ) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE episodes SET consolidation_status = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![status_str(status), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn update_episode_structure(
        &self,
        scope: &Scope,
        id: Uuid,
        update: &engram_core::traits::EpisodeStructureUpdate,
    ) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE episodes SET entities = ?1, topics = ?2, causal_links = ?3,
             emotional_valence = ?4, emotional_intensity = ?5, importance_score = ?6
             WHERE id = ?7 AND tenant_id = ?8 AND agent_id = ?9",
            params![
                serde_json::to_string(&update.entities).unwrap_or_default(),
                serde_json::to_string(&update.topics).unwrap_or_default(),
                uuid_vec_to_json(&update.causal_links),
                update.emotional_valence,
                update.emotional_intensity,
                update.importance_score,
                id.to_string(),
                scope.tenant_id,
                scope.agent_id,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn link_derived_memory(&self, scope: &Scope, episode_id: Uuid, memory_id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let episode = get(&conn, scope, episode_id)?
            .ok_or_else(|| EngramError::EpisodeNotFound { id: episode_id.to_string() })?;
        let mut ids = episode.derived_semantic_ids;
        if !ids.contains(&memory_id) {
            ids.push(memory_id);
        }
        conn.execute(
            "UPDATE episodes SET derived_semantic_ids = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![uuid_vec_to_json(&ids), episode_id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn link_derived_procedure(
        &self,
        scope: &Scope,
        episode_id: Uuid,
        procedure_id: Uuid,
    ) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        let episode = get(&conn, scope, episode_id)?
            .ok_or_else(|| EngramError::EpisodeNotFound { id: episode_id.to_string() })?;
        let mut ids = episode.derived_procedural_ids;
        if !ids.contains(&procedure_id) {
            ids.push(procedure_id);
        }
        conn.execute(
            "UPDATE episodes SET derived_procedural_ids = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![uuid_vec_to_json(&ids), episode_id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn apply_decay(&self, scope: &Scope, archive_threshold: f32) -> EngramResult<usize> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE episodes SET memory_strength = memory_strength * (1.0 - ?1)
             WHERE tenant_id = ?2 AND agent_id = ?3 AND consolidation_status != 'archived'",
            params![Episode::DEFAULT_DECAY_RATE, scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;

        let archived = conn
            .execute(
                "UPDATE episodes SET consolidation_status = 'archived'
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_strength < ?3 AND consolidation_status != 'archived'",
                params![scope.tenant_id, scope.agent_id, archive_threshold],
            )
            .map_err(to_storage_err)?;
        Ok(archived)
    }

    async fn get_weak(&self, scope: &Scope, threshold: f32) -> EngramResult<Vec<Episode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM episodes WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_strength < ?3"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id, threshold], row_to_episode)
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }

    async fn record_access(&self, scope: &Scope, id: Uuid) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE episodes SET access_count = access_count + 1 WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            params![id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn update_outcome(&self, scope: &Scope, id: Uuid, outcome: Outcome) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE episodes SET outcome = ?1 WHERE id = ?2 AND tenant_id = ?3 AND agent_id = ?4",
            params![outcome_str(outcome), id.to_string(), scope.tenant_id, scope.agent_id],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn recent_by_outcome_since(
        &self,
        scope: &Scope,
        outcome: Outcome,
        since: DateTime<Utc>,
        min_importance: f32,
    ) -> EngramResult<Vec<Episode>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM episodes
                 WHERE tenant_id = ?1 AND agent_id = ?2 AND outcome = ?3
                 AND occurred_at >= ?4 AND importance_score >= ?5
                 ORDER BY occurred_at DESC"
            ))
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(
                params![
                    scope.tenant_id,
                    scope.agent_id,
                    outcome_str(outcome),
                    since.to_rfc3339(),
                    min_importance
                ],
                row_to_episode,
            )
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }
}
