//! Builds the embedder, vector store, sync manager and answer agent from the
//! loaded configuration.

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, Result},
    tracing::{debug, warn},
    vaultqa_agents::{AnswerAgent, AnthropicProvider, LlmProvider, OpenAiCompatProvider},
    vaultqa_config::{LlmProviderKind, StoreBackend, VaultQaConfig},
    vaultqa_memory::{
        EmbeddingProvider, MemoryConfig, VaultManager, VectorStore,
        embeddings_openai::OpenAiEmbeddingProvider, store_memory::InMemoryStore,
        store_qdrant::QdrantStore, store_sqlite::SqliteVectorStore,
    },
};

pub fn memory_config(config: &VaultQaConfig, vault_dir: PathBuf) -> MemoryConfig {
    MemoryConfig {
        vault_dir,
        chunk_size: config.chunking.chunk_size,
        chunk_overlap: config.chunking.chunk_overlap,
        batch_size: config.embeddings.batch_size,
    }
}

pub fn embedder(config: &VaultQaConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embeddings = &config.embeddings;
    let provider = OpenAiEmbeddingProvider::new(config.embeddings_api_key()?.clone())
        .with_model(&embeddings.model, embeddings.dimensions)
        .with_base_url(&embeddings.base_url);
    Ok(Arc::new(provider))
}

pub async fn store(config: &VaultQaConfig) -> Result<Arc<dyn VectorStore>> {
    let store = &config.store;
    let collection = store.collection.clone();
    let backend: Arc<dyn VectorStore> = match store.backend {
        StoreBackend::Qdrant => Arc::new(
            QdrantStore::new(&store.url, collection).with_api_key(store.api_key.clone()),
        ),
        StoreBackend::Sqlite => {
            let path = &store.sqlite_path;
            Arc::new(
                SqliteVectorStore::connect(path, collection)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?,
            )
        },
        StoreBackend::Memory => {
            warn!("using the in-memory store; nothing is kept after this run");
            Arc::new(InMemoryStore::new(collection))
        },
    };
    debug!(backend = backend.backend(), collection = %store.collection, "vector store ready");
    Ok(backend)
}

/// A manager for commands that only read the index (the vault path may be unset).
pub async fn manager(config: &VaultQaConfig, vault_dir: PathBuf) -> Result<VaultManager> {
    Ok(VaultManager::new(
        memory_config(config, vault_dir),
        store(config).await?,
        embedder(config)?,
    ))
}

pub fn llm(config: &VaultQaConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm = &config.llm;
    let provider: Arc<dyn LlmProvider> = match llm.provider {
        LlmProviderKind::Anthropic => {
            let mut provider = AnthropicProvider::new(config.llm_api_key()?.clone(), &llm.model);
            if let Some(url) = &llm.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        },
        LlmProviderKind::OpenAi => {
            let mut provider = OpenAiCompatProvider::new(llm.api_key.clone(), &llm.model);
            if let Some(url) = &llm.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        },
    };
    Ok(provider)
}

pub fn answer_agent(config: &VaultQaConfig) -> Result<AnswerAgent> {
    let mut agent = AnswerAgent::new(llm(config)?).with_max_tokens(config.llm.max_tokens);
    if let Some(prompt) = &config.llm.system_prompt {
        agent = agent.with_system_prompt(prompt.clone());
    }
    Ok(agent)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn config_with_keys() -> VaultQaConfig {
        let mut config = VaultQaConfig::default();
        config.embeddings.api_key = Some(Secret::new("sk-embed".into()));
        config.llm.api_key = Some(Secret::new("sk-llm".into()));
        config
    }

    #[test]
    fn memory_config_follows_chunking_section() {
        let mut config = VaultQaConfig::default();
        config.chunking.chunk_size = 400;
        config.embeddings.batch_size = 16;
        let memory = memory_config(&config, PathBuf::from("/vault"));
        assert_eq!(memory.vault_dir, PathBuf::from("/vault"));
        assert_eq!(memory.chunk_size, 400);
        assert_eq!(memory.chunk_overlap, 200);
        assert_eq!(memory.batch_size, 16);
    }

    #[test]
    fn embedder_requires_a_key() {
        let err = embedder(&VaultQaConfig::default()).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let embedder = embedder(&config_with_keys()).unwrap();
        assert_eq!(embedder.model_name(), "text-embedding-3-small");
        assert_eq!(embedder.dimensions(), 1536);
    }

    #[test]
    fn llm_follows_provider_kind() {
        let config = config_with_keys();
        assert_eq!(llm(&config).unwrap().name(), "anthropic");

        let mut config = VaultQaConfig::default();
        config.llm.provider = LlmProviderKind::OpenAi;
        config.llm.model = "llama3".into();
        config.llm.base_url = Some("http://localhost:11434/v1".into());
        let provider = llm(&config).unwrap();
        assert_eq!(provider.name(), "openai-compat");
        assert_eq!(provider.id(), "llama3");
    }

    #[test]
    fn anthropic_without_key_is_rejected() {
        assert!(llm(&VaultQaConfig::default()).is_err());
    }

    #[tokio::test]
    async fn store_backends_are_selectable() {
        let mut config = VaultQaConfig::default();
        config.store.backend = StoreBackend::Memory;
        assert_eq!(store(&config).await.unwrap().backend(), "memory");

        let dir = tempfile::tempdir().unwrap();
        config.store.backend = StoreBackend::Sqlite;
        config.store.sqlite_path = dir.path().join("index.db");
        assert_eq!(store(&config).await.unwrap().backend(), "sqlite");
        assert!(config.store.sqlite_path.exists());

        config.store.backend = StoreBackend::Qdrant;
        assert_eq!(store(&config).await.unwrap().backend(), "qdrant");
    }
}
