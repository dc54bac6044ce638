//! # engram-schema
//!
//! Schema upsert (create-or-add-evidence), contradiction handling, and
//! the working-memory schema-context match score (spec §4.2, §4.9.1,
//! component C4).

mod context;
mod service;

pub use context::context_match_score;
pub use service::{SchemaService, UpsertSchemaRequest};
