//! Configuration for vaultqa: a TOML file with per-section defaults, overridden
//! by the environment variables used by the vault tooling.

pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::ConfigError,
    loader::{CONFIG_FILE_NAME, apply_env_overrides, discover_config_path, load_config, parse_config},
    schema::{
        ChunkingConfig, EmbeddingsConfig, LlmConfig, LlmProviderKind, QueryConfig, StoreBackend,
        StoreConfig, VaultConfig, VaultQaConfig,
    },
    template::CONFIG_TEMPLATE,
};
