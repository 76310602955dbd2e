//! Note vault memory: markdown notes → outline-aware chunks → embeddings → vector
//! store → similarity retrieval.
//!
//! The chunking core ([`outline`], [`chunker`]) is pure and synchronous. Everything
//! that touches the network or disk sits behind the [`embeddings::EmbeddingProvider`]
//! and [`store::VectorStore`] traits and is driven by [`manager::VaultManager`].

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod embeddings_openai;
pub mod indexer;
pub mod manager;
pub mod outline;
pub mod search;
pub mod store;
pub mod store_memory;
pub mod store_qdrant;
#[cfg(feature = "sqlite")]
pub mod store_sqlite;
pub mod vault;

pub use {
    chunker::{BulletChunker, ChunkerConfig},
    config::MemoryConfig,
    embeddings::EmbeddingProvider,
    manager::{MemoryStatus, SyncMode, SyncReport, VaultManager},
    store::{DateRange, VectorStore},
};
