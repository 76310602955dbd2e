use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use {
    directories::ProjectDirs,
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    error::ConfigError,
    schema::{LlmProviderKind, VaultQaConfig},
};

pub const CONFIG_FILE_NAME: &str = "vaultqa.toml";

/// `<user config dir>/vaultqa/vaultqa.toml`, when a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "vaultqa").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Resolve which config file to read.
///
/// An explicit path always wins (even if missing, so the caller can report it).
/// Otherwise `./vaultqa.toml`, then the user config file; `None` means defaults.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    user_config_path().filter(|p| p.is_file())
}

/// Parse a TOML document into a config. Missing sections take their defaults.
pub fn parse_config(text: &str) -> Result<VaultQaConfig, toml::de::Error> {
    toml::from_str(text)
}

/// Load the config file (if any), apply environment overrides and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<VaultQaConfig, ConfigError> {
    let mut config = match discover_config_path(explicit) {
        Some(path) => read_config_file(&path)?,
        None => {
            debug!("no config file found, using defaults");
            VaultQaConfig::default()
        },
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<VaultQaConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Apply the environment variables the vault tooling has always honoured.
///
/// `lookup` is injected so tests do not have to mutate the process environment.
/// Empty values are ignored.
pub fn apply_env_overrides(
    config: &mut VaultQaConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("LOGSEQ_PATH") {
        config.vault.path = Some(PathBuf::from(v));
    }

    if let Some(v) = get("OPENAI_API_KEY") {
        config.embeddings.api_key = Some(Secret::new(v.clone()));
        if config.llm.provider == LlmProviderKind::OpenAi && config.llm.api_key.is_none() {
            config.llm.api_key = Some(Secret::new(v));
        }
    }
    if let Some(v) = get("EMBEDDING_MODEL") {
        config.embeddings.model = v;
    }
    if let Some(v) = get("EMBEDDING_DIMENSIONS") {
        config.embeddings.dimensions = parse_number("EMBEDDING_DIMENSIONS", &v)?;
    }

    if let Some(v) = get("ANTHROPIC_API_KEY")
        && config.llm.provider == LlmProviderKind::Anthropic
    {
        config.llm.api_key = Some(Secret::new(v));
    }
    if let Some(v) = get("CLAUDE_MODEL")
        && config.llm.provider == LlmProviderKind::Anthropic
    {
        config.llm.model = v;
    }

    if let Some(v) = get("QDRANT_URL") {
        config.store.url = v;
    }
    if let Some(v) = get("QDRANT_COLLECTION_NAME") {
        config.store.collection = v;
    }
    if let Some(v) = get("QDRANT_API_KEY") {
        config.store.api_key = Some(Secret::new(v));
    }

    if let Some(v) = get("CHUNK_SIZE") {
        config.chunking.chunk_size = parse_number("CHUNK_SIZE", &v)?;
    }
    if let Some(v) = get("CHUNK_OVERLAP") {
        config.chunking.chunk_overlap = parse_number("CHUNK_OVERLAP", &v)?;
    }
    if let Some(v) = get("TOP_K_RESULTS") {
        config.query.top_k = parse_number("TOP_K_RESULTS", &v)?;
    }

    Ok(())
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        reason: format!("expected a number, got {value:?}"),
    })
}
