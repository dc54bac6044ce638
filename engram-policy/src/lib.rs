//! # engram-policy
//!
//! Per-`(agent, memory_type)` policy enforcement (spec §4.10): upsert
//! validation, `enforce_on_create`'s excess-eviction/auto-summarize path,
//! and the `get_type_weights` feed into the recall scorer (spec §4.6).

mod service;

pub use service::PolicyService;
