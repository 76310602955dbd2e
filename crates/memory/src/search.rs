//! Query-time retrieval: embed the question, ask the store for neighbours.

use std::sync::Arc;

use {
    tracing::debug,
    vaultqa_common::{Result, SearchResult},
};

use crate::{
    embeddings::EmbeddingProvider,
    store::{DateRange, VectorQuery, VectorStore},
};

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// The `top_k` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        self.search_in_range(query, DateRange::default(), top_k)
            .await
    }

    /// Like [`Retriever::search`], restricted to chunks dated within `range`.
    pub async fn search_in_range(
        &self,
        query: &str,
        range: DateRange,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query).await?;
        let results = self
            .store
            .search(&VectorQuery {
                vector,
                limit: top_k,
                range,
            })
            .await?;
        debug!(
            backend = self.store.backend(),
            results = results.len(),
            top_k,
            "retrieved chunks"
        );
        Ok(results)
    }
}
