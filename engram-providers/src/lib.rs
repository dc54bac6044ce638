//! External capability contracts (spec §6): embedding and LLM providers,
//! plus deterministic mock implementations used by tests and by agents
//! that run without a configured provider.

pub mod embedder;
pub mod llm;
pub mod mock;
pub mod types;

pub use embedder::Embedder;
pub use llm::Llm;
pub use mock::{MockEmbedder, MockLlm};
