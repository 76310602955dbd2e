//! SQLite-backed vector store.
//!
//! Vectors are stored as little-endian `f32` blobs next to the JSON payload and
//! searched by brute-force cosine similarity, which is fine at vault scale.

use std::path::Path;

use {
    async_trait::async_trait,
    sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions},
    tracing::{debug, info, warn},
    vaultqa_common::{Chunk, Error, Result, SearchResult},
};

use crate::store::{
    CollectionInfo, EmbeddedChunk, VectorQuery, VectorStore, cosine_similarity, rank,
};

/// Create tables if they do not exist.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS collections (
            name        TEXT PRIMARY KEY,
            dimensions  INTEGER NOT NULL
        )"#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS chunks (
            collection  TEXT NOT NULL,
            id          TEXT NOT NULL,
            source      TEXT NOT NULL,
            date        TEXT,
            payload     TEXT NOT NULL,
            embedding   BLOB NOT NULL,
            PRIMARY KEY (collection, id)
        )"#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(collection, source)")
        .execute(pool)
        .await
        .map_err(db_err)?;

    Ok(())
}

fn db_err(e: sqlx::Error) -> Error {
    Error::store(format!("sqlite: {e}"))
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
}

impl SqliteVectorStore {
    pub fn new(pool: SqlitePool, collection: impl Into<String>) -> Self {
        Self {
            pool,
            collection: collection.into(),
        }
    }

    /// Open (creating if needed) the database file and run migrations.
    pub async fn connect(path: &Path, collection: impl Into<String>) -> Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .connect(&url)
            .await
            .map_err(db_err)?;
        run_migrations(&pool).await?;
        debug!(path = %path.display(), "opened sqlite vector store");
        Ok(Self::new(pool, collection))
    }

    async fn stored_dimensions(&self) -> Result<Option<usize>> {
        let row = sqlx::query("SELECT dimensions FROM collections WHERE name = ?")
            .bind(&self.collection)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| r.get::<i64, _>("dimensions") as usize))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        match self.stored_dimensions().await? {
            Some(existing) if existing != dimensions => Err(Error::store(format!(
                "collection {} holds {existing}-dimensional vectors, not {dimensions}",
                self.collection
            ))),
            Some(_) => Ok(()),
            None => {
                sqlx::query("INSERT INTO collections (name, dimensions) VALUES (?, ?)")
                    .bind(&self.collection)
                    .bind(dimensions as i64)
                    .execute(&self.pool)
                    .await
                    .map_err(db_err)?;
                info!(collection = %self.collection, dimensions, "created collection");
                Ok(())
            },
        }
    }

    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        for point in points {
            let payload = serde_json::to_string(&point.chunk.to_payload())?;
            sqlx::query(
                r#"INSERT OR REPLACE INTO chunks (collection, id, source, date, payload, embedding)
                   VALUES (?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&self.collection)
            .bind(&point.chunk.id)
            .bind(&point.chunk.metadata.source)
            .bind(point.chunk.metadata.date.as_deref())
            .bind(payload)
            .bind(encode_vector(&point.vector))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }
        tx.commit().await.map_err(db_err)?;
        debug!(collection = %self.collection, count = points.len(), "upserted points");
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchResult>> {
        let rows = sqlx::query("SELECT id, date, payload, embedding FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut results = Vec::new();
        for row in rows {
            let date: Option<String> = row.get("date");
            if !query.range.contains(date.as_deref()) {
                continue;
            }
            let id: String = row.get("id");
            let payload: String = row.get("payload");
            let embedding: Vec<u8> = row.get("embedding");

            let chunk = match serde_json::from_str(&payload)
                .and_then(|value| Chunk::from_payload(id.clone(), value))
            {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(id = %id, error = %e, "skipping row with unreadable payload");
                    continue;
                },
            };
            let score = cosine_similarity(&query.vector, &decode_vector(&embedding));
            results.push(SearchResult { chunk, score });
        }

        Ok(rank(results, query.limit))
    }

    async fn delete_by_source(&self, source: &str) -> Result<()> {
        let done = sqlx::query("DELETE FROM chunks WHERE collection = ? AND source = ?")
            .bind(&self.collection)
            .bind(source)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        debug!(source, removed = done.rows_affected(), "deleted points by source");
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let points: i64 = sqlx::query("SELECT COUNT(*) AS n FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?
            .get("n");
        Ok(CollectionInfo {
            name: self.collection.clone(),
            points: points as u64,
            dimensions: self.stored_dimensions().await?,
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{store::DateRange, store_memory::tests::point},
        chrono::NaiveDate,
    };

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    async fn seeded(collection: &str, pool: SqlitePool) -> SqliteVectorStore {
        let store = SqliteVectorStore::new(pool, collection);
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

    #[test]
    fn vector_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        let blob = encode_vector(&v);
        assert_eq!(blob.len(), 12);
        assert_eq!(decode_vector(&blob), v);
    }

    #[tokio::test]
    async fn search_returns_payload_and_ranks() {
        let store = seeded("notes", pool().await).await;
        let results = store
            .search(&VectorQuery {
                vector: vec![0.0, 1.0],
                limit: 2,
                range: DateRange::default(),
            })
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "c");
        assert_eq!(results[0].chunk.content, "content of c");
        assert_eq!(results[0].chunk.metadata.source, "/v/pages/Theron.md");
        assert_eq!(results[1].chunk.id, "b");
    }

    #[tokio::test]
    async fn search_respects_date_range() {
        let store = seeded("notes", pool().await).await;
        let results = store
            .search(&VectorQuery {
                vector: vec![1.0, 1.0],
                limit: 10,
                range: DateRange::new(None, NaiveDate::from_ymd_opt(2024, 12, 31)),
            })
            .await
            .unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, ["a"]);
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let pool = pool().await;
        let notes = seeded("notes", pool.clone()).await;
        let other = SqliteVectorStore::new(pool, "other");
        other.ensure_collection(2).await.unwrap();

        assert_eq!(notes.info().await.unwrap().points, 3);
        assert_eq!(other.info().await.unwrap().points, 0);
    }

    #[tokio::test]
    async fn delete_by_source_and_replace() {
        let store = seeded("notes", pool().await).await;
        store.delete_by_source("/v/pages/Theron.md").await.unwrap();
        store
            .upsert(&[point("a", "/v/journals/2024_12_01.md", None, vec![0.0, 1.0])])
            .await
            .unwrap();

        let info = store.info().await.unwrap();
        assert_eq!(info.points, 2);
        assert_eq!(info.dimensions, Some(2));
    }

    #[tokio::test]
    async fn dimension_change_is_rejected() {
        let store = seeded("notes", pool().await).await;
        assert!(store.ensure_collection(2).await.is_ok());
        let err = store.ensure_collection(1536).await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    #[tokio::test]
    async fn connect_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vaultqa.db");
        let store = SqliteVectorStore::connect(&path, "notes").await.unwrap();
        store.ensure_collection(4).await.unwrap();
        assert!(path.exists());
    }
}
