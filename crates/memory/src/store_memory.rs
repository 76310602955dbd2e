//! Process-local vector store with brute-force cosine search.
//!
//! Nothing survives the process; used for tests and for one-shot runs without a
//! vector database.

use std::collections::HashMap;

use {
    async_trait::async_trait,
    tokio::sync::RwLock,
    tracing::debug,
    vaultqa_common::{Error, Result, SearchResult},
};

use crate::store::{CollectionInfo, EmbeddedChunk, VectorQuery, VectorStore, cosine_similarity, rank};

pub struct InMemoryStore {
    collection: String,
    dimensions: RwLock<Option<usize>>,
    points: RwLock<HashMap<String, EmbeddedChunk>>,
}

impl InMemoryStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            dimensions: RwLock::new(None),
            points: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let mut dims = self.dimensions.write().await;
        match *dims {
            Some(existing) if existing != dimensions => Err(Error::store(format!(
                "collection {} holds {existing}-dimensional vectors, not {dimensions}",
                self.collection
            ))),
            Some(_) => Ok(()),
            None => {
                *dims = Some(dimensions);
                debug!(collection = %self.collection, dimensions, "created in-memory collection");
                Ok(())
            },
        }
    }

    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()> {
        let dims = *self.dimensions.read().await;
        if let Some(expected) = dims
            && let Some(bad) = points.iter().find(|p| p.vector.len() != expected)
        {
            return Err(Error::store(format!(
                "vector for chunk {} has {} dimensions, expected {expected}",
                bad.chunk.id,
                bad.vector.len()
            )));
        }

        let mut store = self.points.write().await;
        for point in points {
            store.insert(point.chunk.id.clone(), point.clone());
        }
        debug!(count = points.len(), "upserted points");
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchResult>> {
        let store = self.points.read().await;
        let results = store
            .values()
            .filter(|p| query.range.contains(p.chunk.metadata.date.as_deref()))
            .map(|p| SearchResult {
                chunk: p.chunk.clone(),
                score: cosine_similarity(&query.vector, &p.vector),
            })
            .collect();
        Ok(rank(results, query.limit))
    }

    async fn delete_by_source(&self, source: &str) -> Result<()> {
        let mut store = self.points.write().await;
        let before = store.len();
        store.retain(|_, p| p.chunk.metadata.source != source);
        debug!(source, removed = before - store.len(), "deleted points by source");
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        Ok(CollectionInfo {
            name: self.collection.clone(),
            points: self.points.read().await.len() as u64,
            dimensions: *self.dimensions.read().await,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        crate::store::DateRange,
        chrono::NaiveDate,
        vaultqa_common::{Chunk, ChunkMetadata, DocumentType},
    };

    pub(crate) fn point(id: &str, source: &str, date: Option<&str>, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: Chunk {
                id: id.into(),
                content: format!("content of {id}"),
                metadata: ChunkMetadata {
                    source: source.into(),
                    doc_type: if date.is_some() {
                        DocumentType::Journal
                    } else {
                        DocumentType::Page
                    },
                    title: id.into(),
                    date: date.map(str::to_string),
                    page_links: vec![],
                    chunk_index: 0,
                    total_chunks: 1,
                },
            },
            vector,
        }
    }

    fn query(vector: Vec<f32>, limit: usize) -> VectorQuery {
        VectorQuery {
            vector,
            limit,
            range: DateRange::default(),
        }
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new("test");
        store.ensure_collection(2).await.unwrap();
        store
            .upsert(&[
                point("a", "/v/journals/2024_12_01.md", Some("2024-12-01T00:00:00Z"), vec![1.0, 0.0]),
                point("b", "/v/journals/2025_01_10.md", Some("2025-01-10T00:00:00Z"), vec![0.7, 0.7]),
                point("c", "/v/pages/Theron.md", None, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let store = seeded().await;
        let results = store.search(&query(vec![1.0, 0.1], 10)).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(results[0].score > results[1].score);

        let top = store.search(&query(vec![0.0, 1.0], 1)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].chunk.id, "c");
    }

    #[tokio::test]
    async fn date_range_excludes_undated_and_out_of_range() {
        let store = seeded().await;
        let mut q = query(vec![1.0, 1.0], 10);
        q.range = DateRange::new(NaiveDate::from_ymd_opt(2025, 1, 1), None);
        let results = store.search(&q).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "b");
    }

    #[tokio::test]
    async fn upsert_replaces_by_id_and_delete_by_source() {
        let store = seeded().await;
        store
            .upsert(&[point("c", "/v/pages/Theron.md", None, vec![1.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(store.len().await, 3);

        store.delete_by_source("/v/pages/Theron.md").await.unwrap();
        assert_eq!(store.info().await.unwrap().points, 2);
        store.delete_by_source("/v/pages/Missing.md").await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = seeded().await;
        assert!(store.ensure_collection(2).await.is_ok());
        assert!(store.ensure_collection(3).await.is_err());
        let err = store
            .upsert(&[point("x", "/v/pages/X.md", None, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }
}
