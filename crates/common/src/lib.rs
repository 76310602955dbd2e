//! Shared types for vaultqa: documents read from the vault, the chunks cut from
//! them, search hits, and the error type used at crate seams.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::{Chunk, ChunkMetadata, Document, DocumentType, SearchResult},
};
