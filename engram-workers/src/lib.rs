//! # engram-workers
//!
//! Background workers W1-W4 (spec §5): decay, consolidation, expirer,
//! tuner. Each is a long-lived, cancellable, tick-scheduled task built on
//! the shared [`supervisor::Ticker`] scaffolding.

mod consolidation;
mod decay;
mod expirer;
pub mod supervisor;
mod tuner;

pub use consolidation::ConsolidationWorker;
pub use decay::DecayWorker;
pub use expirer::ExpirerWorker;
pub use tuner::TunerWorker;
