//! # engram-learning
//!
//! Feedback application and outcome propagation: the closed signal-effect
//! table of spec §4.5 applied via the log-odds confidence algebra,
//! plus episode-outcome and implicit-feedback entry points (component C5).

mod service;

pub use service::{RecordFeedbackRequest, FeedbackService};
