//! Configuration schema. Every section has serde defaults so a partial (or
//! absent) `vaultqa.toml` still yields a usable configuration.

use std::path::PathBuf;

use {
    secrecy::Secret,
    serde::Deserialize,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultQaConfig {
    pub vault: VaultConfig,
    pub embeddings: EmbeddingsConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    pub chunking: ChunkingConfig,
    pub query: QueryConfig,
}

/// Location of the note vault (`journals/` and `pages/` live under it).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
    /// OpenAI-compatible base URL; `/v1/embeddings` is appended as needed.
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    /// Chunks per embedding request and per store upsert.
    pub batch_size: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".into(),
            dimensions: 1536,
            base_url: "https://api.openai.com".into(),
            api_key: None,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    Anthropic,
    /// Any OpenAI-compatible chat-completions endpoint.
    #[serde(rename = "openai", alias = "openai-compat")]
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    pub model: String,
    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,
    pub api_key: Option<Secret<String>>,
    pub max_tokens: u32,
    /// Replaces the built-in system prompt.
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Anthropic,
            model: "claude-haiku-4-5-20251001".into(),
            base_url: None,
            api_key: None,
            max_tokens: 2000,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Qdrant,
    Sqlite,
    /// Process-local store; nothing survives the run.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Qdrant REST endpoint.
    pub url: String,
    pub collection: String,
    pub api_key: Option<Secret<String>>,
    /// Database file for the sqlite backend.
    pub sqlite_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Qdrant,
            url: "http://localhost:6333".into(),
            collection: "logseq-notes".into(),
            api_key: None,
            sqlite_path: PathBuf::from("vaultqa.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Token budget per chunk (estimated as characters / 4).
    pub chunk_size: usize,
    /// Accepted for compatibility; the chunker does not overlap chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub top_k: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { top_k: 100 }
    }
}
