//! # engram-retrieval
//!
//! Composite recall scoring (spec §4.6, component C6) and hybrid
//! vector+graph recall (spec §4.7, component C7).

pub mod hybrid;
pub mod scorer;

pub use hybrid::{HybridRecall, HybridRecallRequest, RelationMultiplier, TraversalConstraints};
