//! Provider selection (spec §9 "Dynamic LLM-provider dispatch"): a closed
//! variant selected once at startup from configuration, with unknown values
//! rejected before any service is constructed — no runtime downcasts.
//!
//! The network-calling implementations behind `openai`/`anthropic`/`gemini`/
//! `cerebras` are themselves out of scope (spec §1: "the LLM/embedding
//! providers, defined only by their abstract capability contracts in §6").
//! Rather than silently falling back to the mock for those variants, the
//! dispatch is total but honest: a deploy configured for a provider this
//! core doesn't carry an HTTP client for fails loudly at startup with
//! `EngramError::ConfigError("provider not compiled in")`, so only `mock`
//! ever serves canned responses. Swapping in a real network client for one
//! variant is a matter of replacing its match arm below — nothing else in
//! the wiring needs to change.

use std::str::FromStr;
use std::sync::Arc;

use engram_core::errors::{EngramError, EngramResult};
use engram_providers::{Embedder, Llm, MockEmbedder, MockLlm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProviderKind {
    OpenAi,
    Anthropic,
    Gemini,
    Cerebras,
    Mock,
}

impl FromStr for LlmProviderKind {
    type Err = EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "gemini" => Ok(Self::Gemini),
            "cerebras" => Ok(Self::Cerebras),
            "mock" => Ok(Self::Mock),
            other => Err(EngramError::ConfigError(format!("unknown LLM_PROVIDER: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    OpenAi,
    Mock,
}

impl FromStr for EmbeddingProviderKind {
    type Err = EngramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "mock" => Ok(Self::Mock),
            other => Err(EngramError::ConfigError(format!("unknown EMBEDDING_PROVIDER: {other}"))),
        }
    }
}

/// Build the LLM client for a recognized provider kind. Only [`LlmProviderKind::Mock`]
/// is backed today; every network-calling variant fails closed instead of
/// silently degrading to mock responses (see the module doc).
pub fn build_llm(kind: LlmProviderKind) -> EngramResult<Arc<dyn Llm>> {
    match kind {
        LlmProviderKind::OpenAi
        | LlmProviderKind::Anthropic
        | LlmProviderKind::Gemini
        | LlmProviderKind::Cerebras => Err(EngramError::ConfigError("provider not compiled in".to_string())),
        LlmProviderKind::Mock => Ok(Arc::new(MockLlm::default())),
    }
}

/// Build the embedder for a recognized provider kind. See [`build_llm`].
pub fn build_embedder(kind: EmbeddingProviderKind) -> EngramResult<Arc<dyn Embedder>> {
    match kind {
        EmbeddingProviderKind::OpenAi => Err(EngramError::ConfigError("provider not compiled in".to_string())),
        EmbeddingProviderKind::Mock => Ok(Arc::new(MockEmbedder::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_llm_provider() {
        assert!("grok".parse::<LlmProviderKind>().is_err());
        assert_eq!("anthropic".parse::<LlmProviderKind>().unwrap(), LlmProviderKind::Anthropic);
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        assert!("cohere".parse::<EmbeddingProviderKind>().is_err());
        assert_eq!("mock".parse::<EmbeddingProviderKind>().unwrap(), EmbeddingProviderKind::Mock);
    }

    #[test]
    fn mock_llm_provider_builds() {
        assert!(build_llm(LlmProviderKind::Mock).is_ok());
    }

    #[test]
    fn network_llm_providers_fail_closed() {
        for kind in [LlmProviderKind::OpenAi, LlmProviderKind::Anthropic, LlmProviderKind::Gemini, LlmProviderKind::Cerebras] {
            assert!(matches!(build_llm(kind), Err(EngramError::ConfigError(_))));
        }
    }

    #[test]
    fn mock_embedding_provider_builds() {
        assert!(build_embedder(EmbeddingProviderKind::Mock).is_ok());
    }

    #[test]
    fn network_embedding_provider_fails_closed() {
        assert!(matches!(build_embedder(EmbeddingProviderKind::OpenAi), Err(EngramError::ConfigError(_))));
    }
}
