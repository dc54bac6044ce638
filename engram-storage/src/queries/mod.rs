pub mod association;
pub mod entity;
pub mod episode;
pub mod feedback;
pub mod memory;
pub mod mutation_log;
pub mod policy;
pub mod procedure;
pub mod schema;
pub mod working_memory;

/// Helper to make `query_row` return `Option` on not-found instead of
/// surfacing `rusqlite::Error::QueryReturnedNoRows`.
pub(crate) trait OptionalRow<T> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalRow<T> for Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Serialize an optional embedding to its JSON-text column representation.
pub(crate) fn embedding_to_text(embedding: &Option<Vec<f32>>) -> Option<String> {
    embedding.as_ref().map(|e| serde_json::to_string(e).unwrap_or_default())
}

/// Parse an embedding column back into `Option<Vec<f32>>`.
pub(crate) fn embedding_from_text(text: Option<String>) -> Option<Vec<f32>> {
    text.and_then(|t| serde_json::from_str(&t).ok())
}

/// Parse an RFC3339 timestamp column, mapping failures through
/// [`crate::store::to_storage_err`].
pub(crate) fn parse_dt(s: &str) -> Result<chrono::DateTime<chrono::Utc>, engram_core::errors::EngramError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| crate::store::to_storage_err(format!("parse datetime '{s}': {e}")))
}

/// Look up a memory's type by id, without paying for a full row parse.
/// Used by feedback aggregation, which groups by the owning memory's type
/// rather than storing it redundantly on every feedback row.
pub(crate) fn memory_type_for(
    conn: &rusqlite::Connection,
    scope: &engram_core::memory::Scope,
    memory_id: uuid::Uuid,
) -> Result<Option<engram_core::memory::MemoryType>, engram_core::errors::EngramError> {
    let type_str: Option<String> = conn
        .query_row(
            "SELECT memory_type FROM memories WHERE id = ?1 AND tenant_id = ?2 AND agent_id = ?3",
            rusqlite::params![memory_id.to_string(), scope.tenant_id, scope.agent_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(crate::store::to_storage_err)?;
    Ok(type_str.and_then(|s| engram_core::memory::MemoryType::parse(&s)))
}
