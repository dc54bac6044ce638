//! # engram-graph
//!
//! Entity resolution and association-graph construction, fired as a
//! best-effort side effect of semantic belief creation (spec §4.8,
//! component C8).

mod service;

pub use service::GraphBuilder;
