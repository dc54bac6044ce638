//! # engram-storage
//!
//! SQLite persistence layer for every Engram memory store (spec §4.2).
//! Single write connection behind an async mutex, WAL journal mode.
//! `Store` implements every trait in `engram_core::traits`; nothing here
//! is reachable except through those trait objects.

mod migrations;
mod queries;
mod store;

pub use store::{to_storage_err, Store};
