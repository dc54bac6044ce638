//! v001: every entity table in the memory system, plus the append-only
//! mutation log and the single-row-per-agent working memory session.

use rusqlite::Connection;

use engram_core::errors::EngramError;

use crate::store::to_storage_err;

pub fn migrate(conn: &Connection) -> Result<(), EngramError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS memories (
            id                   TEXT PRIMARY KEY,
            tenant_id            TEXT NOT NULL,
            agent_id             TEXT NOT NULL,
            memory_type          TEXT NOT NULL,
            content              TEXT NOT NULL,
            embedding            TEXT,
            confidence           REAL NOT NULL,
            reinforcement_count  INTEGER NOT NULL,
            decay_rate           REAL NOT NULL,
            provenance           TEXT NOT NULL,
            source               TEXT NOT NULL,
            last_accessed_at     TEXT NOT NULL,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            needs_review         INTEGER NOT NULL DEFAULT 0,
            archived             INTEGER NOT NULL DEFAULT 0,
            expires_at           TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_memories_agent
            ON memories(tenant_id, agent_id, archived);
        CREATE INDEX IF NOT EXISTS idx_memories_agent_type
            ON memories(tenant_id, agent_id, memory_type);

        CREATE TABLE IF NOT EXISTS episodes (
            id                      TEXT PRIMARY KEY,
            tenant_id               TEXT NOT NULL,
            agent_id                TEXT NOT NULL,
            raw_content             TEXT NOT NULL,
            conversation_id         TEXT,
            occurred_at             TEXT NOT NULL,
            embedding               TEXT,
            entities                TEXT NOT NULL,
            topics                  TEXT NOT NULL,
            causal_links            TEXT NOT NULL,
            emotional_valence       REAL NOT NULL,
            emotional_intensity     REAL NOT NULL,
            importance_score        REAL NOT NULL,
            outcome                 TEXT NOT NULL,
            consolidation_status    TEXT NOT NULL,
            memory_strength         REAL NOT NULL,
            access_count            INTEGER NOT NULL,
            derived_semantic_ids    TEXT NOT NULL,
            derived_procedural_ids  TEXT NOT NULL,
            time_of_day             TEXT NOT NULL,
            day_of_week             TEXT NOT NULL,
            created_at              TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_episodes_agent
            ON episodes(tenant_id, agent_id, occurred_at);
        CREATE INDEX IF NOT EXISTS idx_episodes_agent_status
            ON episodes(tenant_id, agent_id, consolidation_status);

        CREATE TABLE IF NOT EXISTS procedures (
            id                   TEXT PRIMARY KEY,
            tenant_id            TEXT NOT NULL,
            agent_id             TEXT NOT NULL,
            trigger_pattern      TEXT NOT NULL,
            trigger_keywords     TEXT NOT NULL,
            trigger_embedding    TEXT,
            action_template      TEXT NOT NULL,
            action_type          TEXT NOT NULL,
            use_count            INTEGER NOT NULL,
            success_count        INTEGER NOT NULL,
            failure_count        INTEGER NOT NULL,
            confidence           REAL NOT NULL,
            memory_strength      REAL NOT NULL,
            last_used_at         TEXT,
            last_verified_at     TEXT,
            derived_from_episodes TEXT NOT NULL,
            archived             INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_procedures_agent
            ON procedures(tenant_id, agent_id, archived);

        CREATE TABLE IF NOT EXISTS schemas (
            id                   TEXT PRIMARY KEY,
            tenant_id            TEXT NOT NULL,
            agent_id             TEXT NOT NULL,
            schema_type          TEXT NOT NULL,
            name                 TEXT NOT NULL,
            description          TEXT NOT NULL,
            attributes           TEXT NOT NULL,
            applicable_contexts  TEXT NOT NULL,
            evidence_memories    TEXT NOT NULL,
            evidence_episodes    TEXT NOT NULL,
            evidence_count       INTEGER NOT NULL,
            confidence           REAL NOT NULL,
            contradiction_count  INTEGER NOT NULL,
            last_validated_at    TEXT,
            embedding            TEXT,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            UNIQUE(tenant_id, agent_id, schema_type, name)
        );
        CREATE INDEX IF NOT EXISTS idx_schemas_agent
            ON schemas(tenant_id, agent_id);

        CREATE TABLE IF NOT EXISTS associations (
            id                 TEXT PRIMARY KEY,
            tenant_id          TEXT NOT NULL,
            agent_id           TEXT NOT NULL,
            source_type        TEXT NOT NULL,
            source_id          TEXT NOT NULL,
            target_type        TEXT NOT NULL,
            target_id          TEXT NOT NULL,
            relation           TEXT NOT NULL,
            strength           REAL NOT NULL,
            traversal_count    INTEGER NOT NULL,
            created_at         TEXT NOT NULL,
            last_traversed_at  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_associations_source
            ON associations(tenant_id, agent_id, source_type, source_id);
        CREATE INDEX IF NOT EXISTS idx_associations_target
            ON associations(tenant_id, agent_id, target_type, target_id);

        CREATE TABLE IF NOT EXISTS policies (
            tenant_id       TEXT NOT NULL,
            agent_id        TEXT NOT NULL,
            memory_type     TEXT NOT NULL,
            max_memories    INTEGER NOT NULL,
            priority_weight REAL NOT NULL,
            auto_summarize  INTEGER NOT NULL,
            retention_days  INTEGER,
            PRIMARY KEY (tenant_id, agent_id, memory_type)
        );

        CREATE TABLE IF NOT EXISTS feedback (
            id                  TEXT PRIMARY KEY,
            tenant_id           TEXT NOT NULL,
            agent_id            TEXT NOT NULL,
            memory_id           TEXT NOT NULL,
            signal              TEXT NOT NULL,
            implicit            INTEGER NOT NULL,
            detector_confidence REAL,
            created_at          TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_feedback_agent
            ON feedback(tenant_id, agent_id);
        CREATE INDEX IF NOT EXISTS idx_feedback_memory
            ON feedback(memory_id);

        CREATE TABLE IF NOT EXISTS mutation_log (
            seq                      INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id                TEXT NOT NULL,
            agent_id                 TEXT NOT NULL,
            source_type              TEXT NOT NULL,
            source_id                TEXT NOT NULL,
            old_confidence           REAL NOT NULL,
            new_confidence           REAL NOT NULL,
            old_reinforcement_count  INTEGER NOT NULL,
            new_reinforcement_count  INTEGER NOT NULL,
            reason                   TEXT NOT NULL,
            created_at               TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_mutation_log_source
            ON mutation_log(tenant_id, agent_id, source_id);

        CREATE TABLE IF NOT EXISTS working_memory_sessions (
            tenant_id      TEXT NOT NULL,
            agent_id       TEXT NOT NULL,
            current_goal   TEXT,
            active_context TEXT NOT NULL,
            max_slots      INTEGER NOT NULL,
            items          TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            PRIMARY KEY (tenant_id, agent_id)
        );
        ",
    )
    .map_err(to_storage_err)?;

    Ok(())
}
