use {
    async_trait::async_trait,
    chrono::NaiveDate,
    vaultqa_common::{Chunk, Result, SearchResult},
};

/// A chunk together with its embedding, as written to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Inclusive date bounds on a chunk's `date`. An unbounded range matches every
/// chunk; a bounded one never matches chunks without a date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether a stored ISO-8601 date (e.g. `2024-12-27T00:00:00Z`) falls in range.
    pub fn contains(&self, date: Option<&str>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(day) = date.and_then(|d| d.get(..10)).and_then(|d| d.parse::<NaiveDate>().ok())
        else {
            return false;
        };
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

/// Parameters for a similarity search.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub points: u64,
    pub dimensions: Option<usize>,
}

/// Persistent storage of embedded chunks, searchable by cosine similarity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name for logs and status output.
    fn backend(&self) -> &'static str;

    /// Create the collection for vectors of `dimensions` if it does not exist.
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Insert or replace points by chunk id.
    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()>;

    /// Up to `limit` results, most similar first.
    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchResult>>;

    /// Remove every chunk whose `source` equals `source`.
    async fn delete_by_source(&self, source: &str) -> Result<()>;

    async fn info(&self) -> Result<CollectionInfo>;
}

/// Cosine similarity. Mismatched lengths or a zero vector give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 { 0.0 } else { dot / denom }
}

/// Sort by descending score and keep the first `limit`.
pub(crate) fn rank(mut results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(limit);
    results
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn unbounded_range_matches_everything() {
        let range = DateRange::default();
        assert!(range.contains(None));
        assert!(range.contains(Some("2024-12-27T00:00:00Z")));
    }

    #[test]
    fn bounded_range_is_inclusive_and_excludes_undated() {
        let range = DateRange::new(Some(day(2024, 12, 1)), Some(day(2024, 12, 31)));
        assert!(range.contains(Some("2024-12-01T00:00:00Z")));
        assert!(range.contains(Some("2024-12-31T00:00:00Z")));
        assert!(!range.contains(Some("2025-01-01T00:00:00Z")));
        assert!(!range.contains(Some("2024-11-30T00:00:00Z")));
        assert!(!range.contains(None));
        assert!(!range.contains(Some("garbage")));

        let open_end = DateRange::new(Some(day(2024, 6, 1)), None);
        assert!(open_end.contains(Some("2030-01-01T00:00:00Z")));
    }
}
