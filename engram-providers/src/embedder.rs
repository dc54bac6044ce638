use engram_core::errors::EngramResult;

/// Embedding capability contract (spec §6). Implementations must return a
/// fixed dimensionality for the lifetime of an agent.
#[allow(async_fn_in_trait)]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> EngramResult<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> EngramResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }
    fn dimensions(&self) -> usize;
    fn name(&self) -> &str;
    fn is_available(&self) -> bool;
}
