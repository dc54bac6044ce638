use engram_core::errors::EngramResult;

use crate::embedder::Embedder;

/// Deterministic test embedder. Produces a vector with a strong shared
/// baseline component plus a small content-specific perturbation derived
/// from a blake3 hash, so near-duplicate text clusters tightly while
/// distinct text still separates — mirrors the teacher's golden-test
/// `deterministic_embedding` helper, generalized into a reusable provider.
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl Embedder for MockEmbedder {
    async fn embed(&self, text: &str) -> EngramResult<Vec<f32>> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        let mut vec = vec![0.5f32; self.dims];
        for (i, slot) in vec.iter_mut().enumerate() {
            let b = bytes[i % bytes.len()] as f32;
            *slot += (b - 128.0) / 12_800.0;
        }
        Ok(vec)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_embeds_identically() {
        let e = MockEmbedder::default();
        let a = e.embed("hello world").await.unwrap();
        let b = e.embed("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn distinct_text_embeds_differently() {
        let e = MockEmbedder::default();
        let a = e.embed("hello world").await.unwrap();
        let b = e.embed("goodbye world").await.unwrap();
        assert_ne!(a, b);
    }
}
