//! Batched embed-and-upsert of chunks.

use std::{collections::BTreeSet, sync::Arc};

use {
    tracing::{info, warn},
    vaultqa_common::{Chunk, Error, Result},
};

use crate::{
    embeddings::EmbeddingProvider,
    store::{EmbeddedChunk, VectorStore},
};

/// Outcome of an indexing run. A failed batch does not stop later batches.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub chunks_indexed: usize,
    pub batches_indexed: usize,
    pub batches_failed: usize,
    /// Sources with at least one chunk in a failed batch.
    pub failed_sources: BTreeSet<String>,
}

pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Make sure the collection exists with the embedder's dimensions.
    pub async fn prepare(&self) -> Result<()> {
        self.store
            .ensure_collection(self.embedder.dimensions())
            .await
    }

    pub async fn delete_source(&self, source: &str) -> Result<()> {
        self.store.delete_by_source(source).await
    }

    /// Embed and upsert `chunks` in batches of `batch_size`.
    pub async fn index_chunks(&self, chunks: &[Chunk]) -> IndexReport {
        let mut report = IndexReport::default();
        if chunks.is_empty() {
            info!("no chunks to index");
            return report;
        }

        let total = chunks.len();
        for (batch_no, batch) in chunks.chunks(self.batch_size).enumerate() {
            match self.index_batch(batch).await {
                Ok(()) => {
                    report.chunks_indexed += batch.len();
                    report.batches_indexed += 1;
                    info!(
                        indexed = report.chunks_indexed,
                        total, "indexed batch"
                    );
                },
                Err(e) => {
                    warn!(batch = batch_no, size = batch.len(), error = %e, "failed to index batch");
                    report.batches_failed += 1;
                    report
                        .failed_sources
                        .extend(batch.iter().map(|c| c.metadata.source.clone()));
                },
            }
        }
        report
    }

    async fn index_batch(&self, batch: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        let points: Vec<EmbeddedChunk> = batch
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk { chunk, vector })
            .collect();
        self.store.upsert(&points).await
    }
}
