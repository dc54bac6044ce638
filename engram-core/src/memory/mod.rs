mod association;
mod belief;
mod entity;
mod episode;
mod feedback;
mod mutation_log;
mod policy;
mod procedure;
mod schema;
mod scope;
mod working_memory;

pub use association::{Association, AssociationDirection, NodeKind, RelationKind};
pub use belief::{Memory, MemoryType, Provenance};
pub use entity::{Entity, EntityMention};
pub use episode::{ConsolidationStatus, DayOfWeek, Episode, Outcome, TimeOfDay};
pub use feedback::{Feedback, FeedbackEffect, FeedbackSignal, FEEDBACK_EFFECTS};
pub use mutation_log::MutationLogEntry;
pub use policy::{Policy, MIN_PRIORITY_WEIGHT};
pub use procedure::Procedure;
pub use schema::{Schema, SCHEMA_MAX_CONF, SCHEMA_MIN_EVIDENCE};
pub use scope::Scope;
pub use working_memory::{ActivatedItem, ActivationSource, WorkingMemorySession, DEFAULT_MAX_SLOTS};
