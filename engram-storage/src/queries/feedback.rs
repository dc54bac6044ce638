use rusqlite::{params, Row};
use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{Feedback, FeedbackSignal, MemoryType, Scope};
use engram_core::traits::{FeedbackAggregate, FeedbackStore};

use crate::store::{to_storage_err, Store};

use super::{parse_dt, OptionalRow};

fn signal_str(s: FeedbackSignal) -> &'static str {
    match s {
        FeedbackSignal::Used => "used",
        FeedbackSignal::Ignored => "ignored",
        FeedbackSignal::Helpful => "helpful",
        FeedbackSignal::Unhelpful => "unhelpful",
        FeedbackSignal::Contradicted => "contradicted",
        FeedbackSignal::Outdated => "outdated",
    }
}

fn row_to_feedback(row: &Row<'_>) -> rusqlite::Result<EngramResult<Feedback>> {
    let id: String = row.get(0)?;
    let tenant_id: String = row.get(1)?;
    let agent_id: String = row.get(2)?;
    let memory_id: String = row.get(3)?;
    let signal: String = row.get(4)?;
    let implicit: bool = row.get(5)?;
    let detector_confidence: Option<f64> = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok((|| -> EngramResult<Feedback> {
        Ok(Feedback {
            id: Uuid::parse_str(&id).map_err(|e| to_storage_err(e.to_string()))?,
            scope: Scope::new(tenant_id, agent_id),
            memory_id: Uuid::parse_str(&memory_id).map_err(|e| to_storage_err(e.to_string()))?,
            signal: FeedbackSignal::parse(&signal)
                .ok_or_else(|| to_storage_err(format!("unknown feedback signal '{signal}'")))?,
            implicit,
            detector_confidence,
            created_at: parse_dt(&created_at)?,
        })
    })())
}

impl FeedbackStore for Store {
    async fn create(&self, feedback: &Feedback) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO feedback (id, tenant_id, agent_id, memory_id, signal, implicit, detector_confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                feedback.id.to_string(),
                feedback.scope.tenant_id,
                feedback.scope.agent_id,
                feedback.memory_id.to_string(),
                signal_str(feedback.signal),
                feedback.implicit,
                feedback.detector_confidence,
                feedback.created_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn count_by_agent(&self, scope: &Scope) -> EngramResult<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM feedback WHERE tenant_id = ?1 AND agent_id = ?2",
                params![scope.tenant_id, scope.agent_id],
                |row| row.get(0),
            )
            .map_err(to_storage_err)?;
        Ok(count as u64)
    }

    async fn aggregates_by_agent_id(&self, scope: &Scope) -> EngramResult<Vec<FeedbackAggregate>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, agent_id, memory_id, signal, implicit, detector_confidence, created_at
                 FROM feedback WHERE tenant_id = ?1 AND agent_id = ?2",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id], row_to_feedback)
            .map_err(to_storage_err)?;
        let all: Vec<Feedback> = rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect::<EngramResult<Vec<_>>>()?;

        // Feedback rows carry no memory_type of their own; the aggregate is
        // keyed per memory_type by joining against the owning memory.
        let mut by_type: std::collections::HashMap<MemoryType, FeedbackAggregate> = std::collections::HashMap::new();
        for fb in all {
            let memory_type = super::memory_type_for(&conn, scope, fb.memory_id)?;
            let Some(memory_type) = memory_type else { continue };
            let agg = by_type.entry(memory_type).or_insert_with(|| FeedbackAggregate {
                memory_type,
                total: 0,
                used: 0,
                ignored: 0,
                helpful: 0,
                unhelpful: 0,
                contradicted: 0,
                outdated: 0,
            });
            agg.total += 1;
            match fb.signal {
                FeedbackSignal::Used => agg.used += 1,
                FeedbackSignal::Ignored => agg.ignored += 1,
                FeedbackSignal::Helpful => agg.helpful += 1,
                FeedbackSignal::Unhelpful => agg.unhelpful += 1,
                FeedbackSignal::Contradicted => agg.contradicted += 1,
                FeedbackSignal::Outdated => agg.outdated += 1,
            }
        }
        Ok(by_type.into_values().collect())
    }

    async fn list_for_memory(&self, scope: &Scope, memory_id: Uuid) -> EngramResult<Vec<Feedback>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT id, tenant_id, agent_id, memory_id, signal, implicit, detector_confidence, created_at
                 FROM feedback WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_id = ?3
                 ORDER BY created_at ASC",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id, memory_id.to_string()], row_to_feedback)
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }
}
