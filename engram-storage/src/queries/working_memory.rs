use rusqlite::params;

use engram_core::errors::EngramResult;
use engram_core::memory::{ActivatedItem, Scope, WorkingMemorySession};
use engram_core::traits::WorkingMemoryStore;

use crate::store::{to_storage_err, Store};

use super::{parse_dt, OptionalRow};

impl WorkingMemoryStore for Store {
    async fn get(&self, scope: &Scope) -> EngramResult<Option<WorkingMemorySession>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT current_goal, active_context, max_slots, items, updated_at
                 FROM working_memory_sessions WHERE tenant_id = ?1 AND agent_id = ?2",
                params![scope.tenant_id, scope.agent_id],
                |row| {
                    let current_goal: Option<String> = row.get(0)?;
                    let active_context: String = row.get(1)?;
                    let max_slots: i64 = row.get(2)?;
                    let items: String = row.get(3)?;
                    let updated_at: String = row.get(4)?;
                    Ok((current_goal, active_context, max_slots, items, updated_at))
                },
            )
            .optional()
            .map_err(to_storage_err)?;

        let Some((current_goal, active_context, max_slots, items, updated_at)) = row else {
            return Ok(None);
        };

        let active_context: Vec<String> = serde_json::from_str(&active_context).map_err(to_storage_err)?;
        let items: Vec<ActivatedItem> = serde_json::from_str(&items).map_err(to_storage_err)?;

        Ok(Some(WorkingMemorySession {
            scope: scope.clone(),
            current_goal,
            active_context,
            max_slots: max_slots as usize,
            items,
            updated_at: parse_dt(&updated_at)?,
        }))
    }

    async fn persist(&self, session: &WorkingMemorySession) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO working_memory_sessions (tenant_id, agent_id, current_goal, active_context, max_slots, items, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(tenant_id, agent_id) DO UPDATE SET
                current_goal = excluded.current_goal,
                active_context = excluded.active_context,
                max_slots = excluded.max_slots,
                items = excluded.items,
                updated_at = excluded.updated_at",
            params![
                session.scope.tenant_id,
                session.scope.agent_id,
                session.current_goal,
                serde_json::to_string(&session.active_context).unwrap_or_default(),
                session.max_slots as i64,
                serde_json::to_string(&session.items).unwrap_or_default(),
                session.updated_at.to_rfc3339(),
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }
}
