use {async_trait::async_trait, vaultqa_common::Result};

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Model name (e.g. "text-embedding-3-small").
    fn model_name(&self) -> &str;

    /// Embedding vector dimensions.
    fn dimensions(&self) -> usize;

    /// Stable key identifying the provider and model, shown in status output so an
    /// index can be matched to the configuration that built it.
    fn provider_key(&self) -> &str {
        self.model_name()
    }
}
