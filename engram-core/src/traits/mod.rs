//! Store contracts (spec §4.2, leaf component L3).
//!
//! These traits are the seam between the core memory-dynamics engine and
//! any persistence backend. A SQL implementation (`engram-storage`) is
//! canonical, but any backend honoring these contracts over a single
//! `(tenant, agent)` key space is valid.

mod entity_store;
mod episode_store;
mod feedback_store;
mod graph_store;
mod memory_store;
mod mutation_log_store;
mod policy_store;
mod procedure_store;
mod recall_options;
mod schema_store;
mod working_memory_store;

pub use entity_store::{EntityStore, ScoredEntity};
pub use episode_store::{EpisodeStore, EpisodeStructureUpdate, ScoredEpisode};
pub use feedback_store::{FeedbackAggregate, FeedbackStore};
pub use graph_store::GraphStore;
pub use memory_store::{MemoryStore, ScoredMemory};
pub use mutation_log_store::MutationLogStore;
pub use policy_store::PolicyStore;
pub use procedure_store::{ProcedureStore, ScoredProcedure};
pub use recall_options::{RecallOptions, ScoringMode};
pub use schema_store::SchemaStore;
pub use working_memory_store::WorkingMemoryStore;
