//! # engram-app
//!
//! The process-wide wiring object (spec §9 "Global state"): reads
//! configuration, selects providers, constructs every service over one
//! store, and owns the background worker set's lifecycle. The HTTP/REST
//! transport this would normally sit behind is explicitly out of scope
//! (spec §1) — this crate stops at the point a dispatcher would take over.

mod app;
mod config;
mod providers;

pub use app::App;
pub use config::{AppConfig, LogLevel};
pub use providers::{build_embedder, build_llm, EmbeddingProviderKind, LlmProviderKind};

/// Install a `tracing-subscriber` `fmt` layer filtered by `LOG_LEVEL` (spec
/// §6). Mirrors the teacher's `tracing_subscriber::fmt().with_env_filter`
/// init used ahead of its own worker/CLI entry points.
pub fn init_tracing(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
