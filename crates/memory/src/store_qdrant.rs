//! Qdrant vector store over its REST API.

use {
    async_trait::async_trait,
    reqwest::{Client, RequestBuilder},
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, de::DeserializeOwned},
    serde_json::{Map, Value, json},
    tracing::{debug, info, warn},
    vaultqa_common::{Chunk, Error, Result, SearchResult},
};

use crate::store::{CollectionInfo, DateRange, EmbeddedChunk, VectorQuery, VectorStore};

pub struct QdrantStore {
    client: Client,
    base_url: String,
    collection: String,
    api_key: Option<Secret<String>>,
}

#[derive(Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Deserialize)]
struct CollectionList {
    collections: Vec<CollectionName>,
}

#[derive(Deserialize)]
struct CollectionName {
    name: String,
}

#[derive(Deserialize)]
struct CollectionDetails {
    #[serde(default)]
    points_count: Option<u64>,
    #[serde(default)]
    config: Value,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: PointId,
    score: f32,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PointId {
    Uuid(String),
    Num(u64),
}

impl PointId {
    fn into_string(self) -> String {
        match self {
            Self::Uuid(s) => s,
            Self::Num(n) => n.to_string(),
        }
    }
}

impl QdrantStore {
    pub fn new(base_url: impl AsRef<str>, collection: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<Secret<String>>) -> Self {
        self.api_key = api_key;
        self
    }

    fn collection_url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{suffix}", self.base_url, self.collection)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let req = match &self.api_key {
            Some(key) => req.header("api-key", key.expose_secret()),
            None => req,
        };
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                service: "qdrant",
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json::<QdrantResponse<T>>().await?.result)
    }

    async fn collection_exists(&self) -> Result<bool> {
        let list: CollectionList = self
            .send(self.client.get(format!("{}/collections", self.base_url)))
            .await?;
        Ok(list.collections.iter().any(|c| c.name == self.collection))
    }
}

/// Qdrant filter restricting `date` to the range, or `None` when unbounded.
fn date_filter(range: &DateRange) -> Option<Value> {
    if range.is_unbounded() {
        return None;
    }
    let mut bounds = Map::new();
    if let Some(from) = range.from {
        bounds.insert("gte".into(), json!(format!("{from}T00:00:00Z")));
    }
    if let Some(to) = range.to {
        bounds.insert("lte".into(), json!(format!("{to}T23:59:59Z")));
    }
    Some(json!({ "must": [{ "key": "date", "range": bounds }] }))
}

fn source_filter(source: &str) -> Value {
    json!({ "must": [{ "key": "source", "match": { "value": source } }] })
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        if self.collection_exists().await? {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }
        let _: Value = self
            .send(self.client.put(self.collection_url("")).json(&json!({
                "vectors": { "size": dimensions, "distance": "Cosine" }
            })))
            .await?;
        info!(collection = %self.collection, dimensions, "created collection");
        Ok(())
    }

    async fn upsert(&self, points: &[EmbeddedChunk]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let body: Vec<Value> = points
            .iter()
            .map(|p| {
                json!({
                    "id": p.chunk.id,
                    "vector": p.vector,
                    "payload": p.chunk.to_payload(),
                })
            })
            .collect();
        let _: Value = self
            .send(
                self.client
                    .put(self.collection_url("/points"))
                    .query(&[("wait", "true")])
                    .json(&json!({ "points": body })),
            )
            .await?;
        debug!(collection = %self.collection, count = points.len(), "upserted points");
        Ok(())
    }

    async fn search(&self, query: &VectorQuery) -> Result<Vec<SearchResult>> {
        let mut body = json!({
            "vector": query.vector,
            "limit": query.limit,
            "with_payload": true,
        });
        if let Some(filter) = date_filter(&query.range) {
            body["filter"] = filter;
        }

        let points: Vec<ScoredPoint> = self
            .send(
                self.client
                    .post(self.collection_url("/points/search"))
                    .json(&body),
            )
            .await?;

        let mut results = Vec::with_capacity(points.len());
        for point in points {
            let id = point.id.into_string();
            match Chunk::from_payload(id.clone(), point.payload) {
                Ok(chunk) => results.push(SearchResult {
                    chunk,
                    score: point.score,
                }),
                Err(e) => warn!(id = %id, error = %e, "skipping point with unreadable payload"),
            }
        }
        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<()> {
        let _: Value = self
            .send(
                self.client
                    .post(self.collection_url("/points/delete"))
                    .query(&[("wait", "true")])
                    .json(&json!({ "filter": source_filter(source) })),
            )
            .await?;
        debug!(collection = %self.collection, source, "deleted points by source");
        Ok(())
    }

    async fn info(&self) -> Result<CollectionInfo> {
        let details: CollectionDetails = self.send(self.client.get(self.collection_url(""))).await?;
        let dimensions = details
            .config
            .pointer("/params/vectors/size")
            .and_then(Value::as_u64)
            .map(|n| n as usize);
        Ok(CollectionInfo {
            name: self.collection.clone(),
            points: details.points_count.unwrap_or(0),
            dimensions,
        })
    }
}
