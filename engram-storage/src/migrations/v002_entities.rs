//! v002: entity resolution tables for the graph builder (spec §4.8).

use rusqlite::Connection;

use engram_core::errors::EngramError;

use crate::store::to_storage_err;

pub fn migrate(conn: &Connection) -> Result<(), EngramError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS entities (
            id          TEXT PRIMARY KEY,
            tenant_id   TEXT NOT NULL,
            agent_id    TEXT NOT NULL,
            name        TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            aliases     TEXT NOT NULL,
            embedding   TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_entities_agent_type
            ON entities(tenant_id, agent_id, entity_type);
        CREATE INDEX IF NOT EXISTS idx_entities_name
            ON entities(tenant_id, agent_id, entity_type, name);

        CREATE TABLE IF NOT EXISTS entity_mentions (
            entity_id  TEXT NOT NULL,
            memory_id  TEXT NOT NULL,
            tenant_id  TEXT NOT NULL,
            agent_id   TEXT NOT NULL,
            role       TEXT NOT NULL,
            created_at TEXT NOT NULL,
            PRIMARY KEY (entity_id, memory_id)
        );
        CREATE INDEX IF NOT EXISTS idx_entity_mentions_entity
            ON entity_mentions(tenant_id, agent_id, entity_id);
        ",
    )
    .map_err(to_storage_err)?;

    Ok(())
}
