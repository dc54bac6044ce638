//! # engram-procedural
//!
//! Procedural skill matching, recency-weighted selection, and the
//! Stage 3 create-or-reinforce path (spec §4.11 Stage 3, component C3).

mod service;

pub use service::{CreateOrReinforceRequest, ProcedureService};
