//! Migration runner — version tracking, forward-only, transactional per migration.

mod v001_initial_schema;
mod v002_entities;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use engram_core::errors::EngramError;

use crate::store::to_storage_err;

type MigrationFn = fn(&Connection) -> Result<(), EngramError>;

const MIGRATIONS: [(u32, &str, MigrationFn); 2] = [
    (1, "initial_schema", v001_initial_schema::migrate),
    (2, "entities", v002_entities::migrate),
];

/// Latest schema version this binary knows how to reach.
pub const LATEST_VERSION: u32 = 2;

pub fn current_version(conn: &Connection) -> Result<u32, EngramError> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(to_storage_err)?;

    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(to_storage_err)
}

/// Run all pending migrations. Forward-only, each wrapped in a transaction.
pub fn run_migrations(conn: &Connection) -> Result<u32, EngramError> {
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!("database schema is up to date (v{current})");
        return Ok(0);
    }

    info!("running migrations: v{current} -> v{LATEST_VERSION}");

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE").map_err(to_storage_err)?;

        match migrate_fn(conn) {
            Ok(()) => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    [version],
                )
                .map_err(to_storage_err)?;
                conn.execute_batch("COMMIT").map_err(to_storage_err)?;
                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(e);
            }
        }
    }

    info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
