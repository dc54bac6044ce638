use rusqlite::{params, Row};

use engram_core::errors::EngramResult;
use engram_core::memory::{MemoryType, Policy, Scope};
use engram_core::traits::PolicyStore;

use crate::store::{to_storage_err, Store};

fn row_to_policy(row: &Row<'_>) -> rusqlite::Result<EngramResult<Policy>> {
    let tenant_id: String = row.get(0)?;
    let agent_id: String = row.get(1)?;
    let memory_type: String = row.get(2)?;
    let max_memories: u32 = row.get(3)?;
    let priority_weight: f64 = row.get(4)?;
    let auto_summarize: bool = row.get(5)?;
    let retention_days: Option<u32> = row.get(6)?;

    Ok((|| -> EngramResult<Policy> {
        Ok(Policy {
            scope: Scope::new(tenant_id, agent_id),
            memory_type: MemoryType::parse(&memory_type)
                .ok_or_else(|| to_storage_err(format!("unknown memory_type '{memory_type}'")))?,
            max_memories,
            priority_weight,
            auto_summarize,
            retention_days,
        })
    })())
}

impl PolicyStore for Store {
    async fn upsert(&self, policy: &Policy) -> EngramResult<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO policies (tenant_id, agent_id, memory_type, max_memories, priority_weight, auto_summarize, retention_days)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(tenant_id, agent_id, memory_type) DO UPDATE SET
                max_memories = excluded.max_memories,
                priority_weight = excluded.priority_weight,
                auto_summarize = excluded.auto_summarize,
                retention_days = excluded.retention_days",
            params![
                policy.scope.tenant_id,
                policy.scope.agent_id,
                policy.memory_type.as_str(),
                policy.max_memories,
                policy.priority_weight,
                policy.auto_summarize,
                policy.retention_days,
            ],
        )
        .map_err(to_storage_err)?;
        Ok(())
    }

    async fn get(&self, scope: &Scope, memory_type: MemoryType) -> EngramResult<Option<Policy>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT tenant_id, agent_id, memory_type, max_memories, priority_weight, auto_summarize, retention_days
                 FROM policies WHERE tenant_id = ?1 AND agent_id = ?2 AND memory_type = ?3",
            )
            .map_err(to_storage_err)?;
        use super::OptionalRow;
        stmt.query_row(params![scope.tenant_id, scope.agent_id, memory_type.as_str()], row_to_policy)
            .optional()
            .map_err(to_storage_err)?
            .transpose()
    }

    async fn list_by_agent(&self, scope: &Scope) -> EngramResult<Vec<Policy>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT tenant_id, agent_id, memory_type, max_memories, priority_weight, auto_summarize, retention_days
                 FROM policies WHERE tenant_id = ?1 AND agent_id = ?2",
            )
            .map_err(to_storage_err)?;
        let rows = stmt
            .query_map(params![scope.tenant_id, scope.agent_id], row_to_policy)
            .map_err(to_storage_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?.into_iter().collect()
    }
}
