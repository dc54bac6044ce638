//! Metacognitive reporting (spec §4.15, component A1).
//!
//! Everything here is read-only: these reports recompute their numbers
//! from current store state on every call and never write anything back.
//! Persisting a reassessed confidence, if a caller wants to, goes through
//! the normal `MemoryStore::update_confidence` path like any other update.

mod service;

pub use service::{ConfidenceReassessment, MetacognitiveService, StrategyReflection, UncertaintyReport};
