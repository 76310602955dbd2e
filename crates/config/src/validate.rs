use std::path::Path;

use {secrecy::Secret, url::Url};

use crate::{
    error::ConfigError,
    schema::{StoreBackend, VaultQaConfig},
};

impl VaultQaConfig {
    /// Structural checks that hold for every command.
    ///
    /// Keys and the vault path are checked lazily by the accessors below, since
    /// `query` never needs the vault and `config show` needs nothing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "chunking.chunk_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.embeddings.dimensions == 0 {
            return Err(ConfigError::Invalid {
                key: "embeddings.dimensions",
                reason: "must be greater than zero".into(),
            });
        }
        if self.embeddings.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "embeddings.batch_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.query.top_k == 0 {
            return Err(ConfigError::Invalid {
                key: "query.top_k",
                reason: "must be greater than zero".into(),
            });
        }
        if self.store.backend == StoreBackend::Qdrant {
            Url::parse(&self.store.url).map_err(|e| ConfigError::Invalid {
                key: "store.url",
                reason: e.to_string(),
            })?;
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Missing("store.collection"));
        }
        Ok(())
    }

    pub fn vault_path(&self) -> Result<&Path, ConfigError> {
        match self.vault.path.as_deref() {
            Some(p) if !p.as_os_str().is_empty() => Ok(p),
            _ => Err(ConfigError::Missing("vault.path (or LOGSEQ_PATH)")),
        }
    }

    pub fn embeddings_api_key(&self) -> Result<&Secret<String>, ConfigError> {
        self.embeddings
            .api_key
            .as_ref()
            .ok_or(ConfigError::Missing("embeddings.api_key (or OPENAI_API_KEY)"))
    }

    pub fn llm_api_key(&self) -> Result<&Secret<String>, ConfigError> {
        self.llm
            .api_key
            .as_ref()
            .ok_or(ConfigError::Missing("llm.api_key (or ANTHROPIC_API_KEY)"))
    }
}
