use std::path::PathBuf;

use crate::chunker::{ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};

/// Configuration for the memory subsystem.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Vault root; notes are read from its `journals/` and `pages/` directories.
    pub vault_dir: PathBuf,
    /// Target chunk size in tokens (estimated as characters / 4).
    pub chunk_size: usize,
    /// Accepted and carried through; chunks are not overlapped.
    pub chunk_overlap: usize,
    /// Chunks per embedding request and per store upsert.
    pub batch_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            vault_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            batch_size: 100,
        }
    }
}

impl MemoryConfig {
    pub fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }
}
