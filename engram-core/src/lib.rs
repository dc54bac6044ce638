//! # engram-core
//!
//! Data model, confidence algebra, vector math, and store contracts for
//! the Engram memory-dynamics engine. This crate has no I/O: it defines
//! the types every other Engram crate builds on, and the trait seams
//! (`traits::*`) that `engram-storage` implements.

pub mod confidence;
pub mod config;
pub mod errors;
pub mod memory;
pub mod traits;
pub mod vector;

pub use errors::{EngramError, EngramResult};
