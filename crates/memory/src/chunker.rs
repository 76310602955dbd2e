//! Outline-aware chunking.
//!
//! A document is parsed into a bullet forest, top-level bullets are packed into
//! sections that fit the token budget, and any section that still does not fit
//! is split into one fragment per root-to-leaf path so every fragment keeps its
//! ancestors as context. Content without bullets becomes a single chunk.

use {
    uuid::Uuid,
    vaultqa_common::{Chunk, ChunkMetadata, Document},
};

use crate::outline::{BulletNode, parse_outline, render_outline, render_subtree};

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Token budget per chunk.
    pub chunk_size: usize,
    /// Carried for configuration compatibility. Chunks never overlap.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Approximate token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// Greedily pack consecutive roots into sections of at most `chunk_size`
/// estimated tokens.
///
/// A root is never split here: a root that alone exceeds the budget still forms
/// its own section. Sections are contiguous, non-empty and in document order.
pub fn group_into_sections(roots: &[BulletNode], chunk_size: usize) -> Vec<&[BulletNode]> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut current = 0;

    for (i, node) in roots.iter().enumerate() {
        let size = estimate_tokens(&render_subtree(node));
        if i > start && current + size > chunk_size {
            sections.push(&roots[start..i]);
            start = i;
            current = size;
        } else {
            current += size;
        }
    }
    if start < roots.len() {
        sections.push(&roots[start..]);
    }

    sections
}

/// One fragment per root-to-leaf path: the ancestors' texts followed by the
/// leaf's text, joined by newlines, in depth-first order.
pub fn split_section(nodes: &[BulletNode]) -> Vec<String> {
    let mut fragments = Vec::new();
    for node in nodes {
        if node.is_leaf() {
            fragments.push(node.text.clone());
            continue;
        }
        for tail in split_section(&node.children) {
            fragments.push(format!("{}\n{}", node.text, tail));
        }
    }
    fragments
}

/// Chunk texts for `content`, without metadata.
///
/// Sections that fit the budget are emitted as rendered outline text; the rest
/// are split by [`split_section`]. A leaf longer than the budget is emitted whole.
/// Non-blank content that yields nothing else is returned verbatim as one fragment.
pub fn outline_fragments(content: &str, chunk_size: usize) -> Vec<String> {
    let forest = parse_outline(content);
    let mut fragments = Vec::new();

    for section in group_into_sections(&forest, chunk_size) {
        let text = render_outline(section);
        if estimate_tokens(&text) <= chunk_size {
            fragments.push(text);
        } else {
            fragments.extend(split_section(section));
        }
    }

    if fragments.is_empty() && !content.trim().is_empty() {
        fragments.push(content.to_string());
    }

    fragments
}

/// Turns documents into chunks ready for embedding.
///
/// Stateless apart from its configuration, so one instance can be shared across
/// tasks.
#[derive(Debug, Clone, Default)]
pub struct BulletChunker {
    config: ChunkerConfig,
}

impl BulletChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a document. Every chunk gets a fresh id; `chunk_index` runs from 0
    /// and `total_chunks` is the number of chunks returned.
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let fragments = outline_fragments(&doc.content, self.config.chunk_size);
        let total_chunks = fragments.len();
        let source = doc.source();
        let date = doc.iso_date();

        fragments
            .into_iter()
            .enumerate()
            .map(|(chunk_index, content)| Chunk {
                id: Uuid::new_v4().to_string(),
                content,
                metadata: ChunkMetadata {
                    source: source.clone(),
                    doc_type: doc.doc_type,
                    title: doc.title.clone(),
                    date: date.clone(),
                    page_links: doc.page_links.clone(),
                    chunk_index,
                    total_chunks,
                },
            })
            .collect()
    }
}
