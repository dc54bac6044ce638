//! # engram-episodic
//!
//! Episode encoding, three-mode recall, and outcome recording (spec §4.4,
//! component C2).

mod service;

pub use service::{EncodeEpisodeRequest, EpisodeService, RecallMode};
