use std::{fmt, path::PathBuf};

use {
    chrono::{NaiveDate, NaiveTime, SecondsFormat},
    serde::{Deserialize, Serialize},
};

/// Where a note lives in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Journal,
    Page,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One note read from the vault.
///
/// `content` has any leading frontmatter block already removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    /// File stem, e.g. `2024_12_27` or `Caelum Fenovar`.
    pub filename: String,
    pub doc_type: DocumentType,
    pub date: Option<NaiveDate>,
    pub content: String,
    pub title: String,
    pub page_links: Vec<String>,
    pub block_refs: Vec<String>,
}

impl Document {
    /// The path as stored in chunk metadata and used for delete-by-source.
    pub fn source(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    /// Journal date as an ISO-8601 timestamp at UTC midnight.
    pub fn iso_date(&self) -> Option<String> {
        self.date.map(|d| {
            d.and_time(NaiveTime::MIN)
                .and_utc()
                .to_rfc3339_opts(SecondsFormat::Secs, true)
        })
    }
}

/// Metadata stamped on every chunk.
///
/// Serialized field names match the payload keys written to the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub page_links: Vec<String>,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

/// The unit of text that gets embedded and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Serialize, Deserialize)]
struct ChunkPayload {
    content: String,
    #[serde(flatten)]
    metadata: ChunkMetadata,
}

impl Chunk {
    /// Flat JSON payload: `content` next to the metadata fields.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "content": self.content,
            "source": self.metadata.source,
            "type": self.metadata.doc_type,
            "title": self.metadata.title,
            "date": self.metadata.date,
            "pageLinks": self.metadata.page_links,
            "chunkIndex": self.metadata.chunk_index,
            "totalChunks": self.metadata.total_chunks,
        })
    }

    /// Rebuild a chunk from a stored point id and its payload.
    pub fn from_payload(id: impl Into<String>, payload: serde_json::Value) -> serde_json::Result<Self> {
        let ChunkPayload { content, metadata } = serde_json::from_value(payload)?;
        Ok(Self {
            id: id.into(),
            content,
            metadata,
        })
    }
}

/// A retrieved chunk and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    pub score: f32,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn journal() -> Document {
        Document {
            path: PathBuf::from("/vault/journals/2024_12_27.md"),
            filename: "2024_12_27".into(),
            doc_type: DocumentType::Journal,
            date: NaiveDate::from_ymd_opt(2024, 12, 27),
            content: "- Session 42".into(),
            title: "December 27, 2024".into(),
            page_links: vec![],
            block_refs: vec![],
        }
    }

    #[test]
    fn iso_date_is_utc_midnight() {
        assert_eq!(
            journal().iso_date().as_deref(),
            Some("2024-12-27T00:00:00Z")
        );
    }

    #[test]
    fn pages_have_no_date() {
        let mut doc = journal();
        doc.doc_type = DocumentType::Page;
        doc.date = None;
        assert!(doc.iso_date().is_none());
        assert_eq!(doc.source(), "/vault/journals/2024_12_27.md");
    }

    #[test]
    fn payload_uses_store_field_names() {
        let chunk = Chunk {
            id: "id-1".into(),
            content: "- Parent".into(),
            metadata: ChunkMetadata {
                source: "/vault/pages/Theron.md".into(),
                doc_type: DocumentType::Page,
                title: "Theron".into(),
                date: None,
                page_links: vec!["Phylactery".into()],
                chunk_index: 2,
                total_chunks: 5,
            },
        };

        let payload = chunk.to_payload();
        assert_eq!(payload["type"], "page");
        assert_eq!(payload["pageLinks"][0], "Phylactery");
        assert_eq!(payload["chunkIndex"], 2);
        assert_eq!(payload["totalChunks"], 5);

        let back = Chunk::from_payload("id-1", payload).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn payload_without_links_defaults_to_empty() {
        let payload = serde_json::json!({
            "content": "text",
            "source": "/vault/journals/2024_01_01.md",
            "type": "journal",
            "title": "January 1, 2024",
            "date": "2024-01-01T00:00:00Z",
            "chunkIndex": 0,
            "totalChunks": 1,
        });
        let chunk = Chunk::from_payload("p", payload).unwrap();
        assert!(chunk.metadata.page_links.is_empty());
        assert_eq!(chunk.metadata.doc_type, DocumentType::Journal);
        assert_eq!(chunk.metadata.date.as_deref(), Some("2024-01-01T00:00:00Z"));
    }
}
