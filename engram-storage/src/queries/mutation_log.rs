use rusqlite::params;
use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{MutationLogEntry, Scope};
use engram_core::traits::MutationLogStore;

use crate::store::{to_storage_err, Store};

use super::parse_dt;

impl MutationLogStore for Store {
    async fn append(&self, entry: &MutationLogEntry) -> EngramResult<i64> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO mutation_log (
                tenant_id, agent_id, source_type, source_id, old_confidence, new_confidence,
                old_reinforcement_count, new_reinforcement_count, reason, created_at
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            params![
                entry.scope.tenant_id,
                entry.scope.agent_id,
                entry.source_type,
                entry.source_id.to_string(),
                entry.old_confidence,
                entry.new_confidence,
                entry.old_reinforcement_count,
                entry.new_reinforcement_count,
                entry.reason,
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(conn.last_insert_rowid())
    }

    async fn list_for_source(&self, scope: &Scope, source_id: Uuid) -> EngramResult<Vec<MutationLogEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT seq, tenant_id, agent_id, source_type, source_id, old_confidence, new_confidence,
                        old_reinforcement_count, new_reinforcement_count, reason, created_at
                 FROM mutation_log WHERE tenant_id = ?1 AND agent_id = ?2 AND source_id = ?3
                 ORDER BY seq ASC",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id, source_id.to_string()], |row| {
                let seq: i64 = row.get(0)?;
                let tenant_id: String = row.get(1)?;
                let agent_id: String = row.get(2)?;
                let source_type: String = row.get(3)?;
                let source_id: String = row.get(4)?;
                let old_confidence: f64 = row.get(5)?;
                let new_confidence: f64 = row.get(6)?;
                let old_reinforcement_count: i64 = row.get(7)?;
                let new_reinforcement_count: i64 = row.get(8)?;
                let reason: String = row.get(9)?;
                let created_at: String = row.get(10)?;
                Ok((|| -> EngramResult<MutationLogEntry> {
                    Ok(MutationLogEntry {
                        seq,
                        scope: Scope::new(tenant_id, agent_id),
                        source_type,
                        source_id: Uuid::parse_str(&source_id).map_err(|e| to_storage_err(e.to_string()))?,
                        old_confidence,
                        new_confidence,
                        old_reinforcement_count,
                        new_reinforcement_count,
                        reason,
                        created_at: parse_dt(&created_at)?,
                    })
                })())
            })
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }
}
