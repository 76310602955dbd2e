/// Vault manager: orchestrates reading notes, chunking, embedding, and search.
use std::{sync::Arc, time::SystemTime};

use {
    anyhow::Context,
    tracing::{debug, info, warn},
    vaultqa_common::{Chunk, SearchResult},
};

use crate::{
    chunker::BulletChunker,
    config::MemoryConfig,
    embeddings::EmbeddingProvider,
    indexer::Indexer,
    search::Retriever,
    store::{DateRange, VectorStore},
    vault::VaultReader,
};

/// Which notes a sync reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Every note in the vault. Existing points are upserted alongside, not cleared.
    Full,
    /// Notes modified after `since`; their old chunks are deleted before re-indexing.
    Incremental { since: SystemTime },
}

pub struct VaultManager {
    config: MemoryConfig,
    reader: VaultReader,
    chunker: BulletChunker,
    indexer: Indexer,
    retriever: Retriever,
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

/// Status info about the index.
#[derive(Debug, Clone)]
pub struct MemoryStatus {
    pub backend: &'static str,
    pub collection: String,
    pub total_chunks: u64,
    pub dimensions: Option<usize>,
    pub embedding_model: String,
    pub embedding_provider_key: String,
}

/// Sync report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub documents_read: usize,
    pub documents_indexed: usize,
    /// Documents that produced no chunks (blank notes).
    pub documents_empty: usize,
    /// Documents with at least one chunk that could not be stored.
    pub documents_failed: usize,
    pub chunks_indexed: usize,
    pub batches_failed: usize,
}

impl VaultManager {
    pub fn new(
        config: MemoryConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            reader: VaultReader::new(config.vault_dir.clone()),
            chunker: BulletChunker::new(config.chunker()),
            indexer: Indexer::new(embedder.clone(), store.clone(), config.batch_size),
            retriever: Retriever::new(embedder.clone(), store.clone()),
            config,
            store,
            embedder,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Read notes, chunk them, and index the chunks.
    ///
    /// Only failing to prepare the collection is fatal. Unreadable notes and failed
    /// batches are logged and counted in the report.
    pub async fn sync(&self, mode: SyncMode) -> anyhow::Result<SyncReport> {
        let mut report = SyncReport::default();

        self.indexer
            .prepare()
            .await
            .context("failed to prepare vector collection")?;

        let documents = match mode {
            SyncMode::Full => {
                info!(vault = %self.config.vault_dir.display(), "starting full sync");
                self.reader.read_all().await
            },
            SyncMode::Incremental { since } => {
                let paths = self.reader.modified_since(since).await;
                if paths.is_empty() {
                    info!("no modified notes to sync");
                    return Ok(report);
                }
                info!(count = paths.len(), "starting incremental sync");
                self.reader.read_paths(&paths).await
            },
        };
        report.documents_read = documents.len();

        let mut chunks: Vec<Chunk> = Vec::new();
        let mut indexed_sources = Vec::new();
        for doc in &documents {
            let source = doc.source();
            if matches!(mode, SyncMode::Incremental { .. })
                && let Err(e) = self.indexer.delete_source(&source).await
            {
                warn!(path = %source, error = %e, "failed to delete old chunks, skipping note");
                report.documents_failed += 1;
                continue;
            }

            let doc_chunks = self.chunker.chunk_document(doc);
            debug!(title = %doc.title, chunks = doc_chunks.len(), "chunked note");
            if doc_chunks.is_empty() {
                report.documents_empty += 1;
                continue;
            }
            chunks.extend(doc_chunks);
            indexed_sources.push(source);
        }
        info!(chunks = chunks.len(), documents = indexed_sources.len(), "chunked notes");

        let index = self.indexer.index_chunks(&chunks).await;
        report.chunks_indexed = index.chunks_indexed;
        report.batches_failed = index.batches_failed;
        for source in &indexed_sources {
            if index.failed_sources.contains(source) {
                report.documents_failed += 1;
            } else {
                report.documents_indexed += 1;
            }
        }

        info!(
            indexed = report.documents_indexed,
            failed = report.documents_failed,
            chunks = report.chunks_indexed,
            "sync finished"
        );
        Ok(report)
    }

    /// Semantic search over the indexed notes.
    pub async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchResult>> {
        Ok(self.retriever.search(query, top_k).await?)
    }

    /// Semantic search restricted to notes dated within `range`.
    pub async fn search_in_range(
        &self,
        query: &str,
        range: DateRange,
        top_k: usize,
    ) -> anyhow::Result<Vec<SearchResult>> {
        Ok(self.retriever.search_in_range(query, range, top_k).await?)
    }

    /// Get status information about the index.
    pub async fn status(&self) -> anyhow::Result<MemoryStatus> {
        let info = self
            .store
            .info()
            .await
            .context("failed to read collection info")?;
        Ok(MemoryStatus {
            backend: self.store.backend(),
            collection: info.name,
            total_chunks: info.points,
            dimensions: info.dimensions,
            embedding_model: self.embedder.model_name().to_string(),
            embedding_provider_key: self.embedder.provider_key().to_string(),
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::store_memory::InMemoryStore,
        async_trait::async_trait,
        std::time::Duration,
        tempfile::TempDir,
        vaultqa_common::{DocumentType, Error, Result},
    };

    /// Mock embedding provider that produces deterministic vectors from content.
    ///
    /// Each of 8 dimensions corresponds to a keyword; a text containing the keyword
    /// gets 1.0 in that dimension. Texts containing "poison" fail to embed.
    struct MockEmbedder;

    const KEYWORDS: [&str; 8] = [
        "caelum", "theron", "ruins", "phylactery", "shadow", "tavern", "dragon", "spell",
    ];

    fn keyword_embedding(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|kw| if lower.contains(kw) { 1.0 } else { 0.0 })
            .collect()
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.contains("poison") {
                return Err(Error::embedding("mock failure"));
            }
            Ok(keyword_embedding(text))
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }

        fn dimensions(&self) -> usize {
            8
        }
    }

    fn setup(batch_size: usize) -> (VaultManager, Arc<InMemoryStore>, TempDir) {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("journals")).unwrap();
        std::fs::create_dir_all(tmp.path().join("pages")).unwrap();

        let config = MemoryConfig {
            vault_dir: tmp.path().to_path_buf(),
            chunk_size: 20,
            chunk_overlap: 0,
            batch_size,
        };
        let store = Arc::new(InMemoryStore::new("notes"));
        let manager = VaultManager::new(config, store.clone(), Arc::new(MockEmbedder));
        (manager, store, tmp)
    }

    fn write(tmp: &TempDir, rel: &str, content: &str) {
        std::fs::write(tmp.path().join(rel), content).unwrap();
    }

    #[tokio::test]
    async fn full_sync_then_search() {
        let (manager, _store, tmp) = setup(100);
        write(
            &tmp,
            "journals/2024_12_27.md",
            "- Session 42\n\t- Explored the ruins\n\t- [[Caelum]] revealed a secret\n",
        );
        write(
            &tmp,
            "pages/Theron.md",
            "---\ntitle: Theron the Lich\n---\n- Theron guards the phylactery\n",
        );
        write(&tmp, "pages/Empty.md", "   \n");

        let report = manager.sync(SyncMode::Full).await.unwrap();
        assert_eq!(report.documents_read, 3);
        assert_eq!(report.documents_indexed, 2);
        assert_eq!(report.documents_empty, 1);
        assert_eq!(report.documents_failed, 0);
        assert!(report.chunks_indexed >= 2);

        let results = manager.search("where is the phylactery", 3).await.unwrap();
        assert_eq!(results[0].chunk.metadata.title, "Theron the Lich");
        assert_eq!(results[0].chunk.metadata.doc_type, DocumentType::Page);

        let results = manager.search("what did Caelum say", 3).await.unwrap();
        assert!(results[0].chunk.content.contains("Caelum"));
        assert_eq!(
            results[0].chunk.metadata.date.as_deref(),
            Some("2024-12-27T00:00:00Z")
        );

        let status = manager.status().await.unwrap();
        assert_eq!(status.backend, "memory");
        assert_eq!(status.collection, "notes");
        assert_eq!(status.total_chunks as usize, report.chunks_indexed);
        assert_eq!(status.dimensions, Some(8));
        assert_eq!(status.embedding_model, "mock-model");
    }

    #[tokio::test]
    async fn range_search_filters_journals() {
        let (manager, _store, tmp) = setup(100);
        write(&tmp, "journals/2024_11_01.md", "- a dragon attacked the tavern\n");
        write(&tmp, "journals/2025_01_15.md", "- a dragon slept\n");
        write(&tmp, "pages/Dragon.md", "- dragon lore\n");
        manager.sync(SyncMode::Full).await.unwrap();

        let range = DateRange::new(chrono::NaiveDate::from_ymd_opt(2025, 1, 1), None);
        let results = manager.search_in_range("dragon", range, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.metadata.title, "January 15, 2025");
    }

    #[tokio::test]
    async fn failed_batch_is_reported_and_others_land() {
        let (manager, store, tmp) = setup(1);
        write(&tmp, "pages/Good.md", "- the ruins\n");
        write(&tmp, "pages/Bad.md", "- poison in the well\n");

        let report = manager.sync(SyncMode::Full).await.unwrap();
        assert_eq!(report.documents_indexed, 1);
        assert_eq!(report.documents_failed, 1);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn incremental_sync_replaces_old_chunks() {
        let (manager, store, tmp) = setup(100);
        write(&tmp, "pages/Theron.md", "- Theron\n- the spell\n- the shadow\n");
        manager.sync(SyncMode::Full).await.unwrap();
        let before = store.len().await;
        assert!(before >= 1);

        let since = SystemTime::now() - Duration::from_secs(60);
        write(&tmp, "pages/Theron.md", "- Theron was destroyed\n");
        let report = manager
            .sync(SyncMode::Incremental { since })
            .await
            .unwrap();
        assert_eq!(report.documents_read, 1);
        assert_eq!(report.documents_indexed, 1);
        assert_eq!(store.len().await, 1);

        let results = manager.search("theron", 5).await.unwrap();
        assert_eq!(results[0].chunk.content, "- Theron was destroyed");
    }

    #[tokio::test]
    async fn incremental_sync_with_nothing_modified_is_empty() {
        let (manager, store, tmp) = setup(100);
        write(&tmp, "pages/Theron.md", "- Theron\n");

        let future = SystemTime::now() + Duration::from_secs(3600);
        let report = manager
            .sync(SyncMode::Incremental { since: future })
            .await
            .unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn full_sync_twice_accumulates_points() {
        let (manager, store, tmp) = setup(100);
        write(&tmp, "pages/Theron.md", "- Theron\n");
        manager.sync(SyncMode::Full).await.unwrap();
        manager.sync(SyncMode::Full).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn collection_mismatch_aborts_sync() {
        let (manager, store, _tmp) = setup(100);
        store.ensure_collection(3).await.unwrap();
        let err = manager.sync(SyncMode::Full).await.unwrap_err();
        assert!(err.to_string().contains("prepare"));
    }
}
