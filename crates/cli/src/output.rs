//! Human-readable renderings printed by the commands.

use std::fmt::Write as _;

use {
    secrecy::Secret,
    vaultqa_agents::answer::display_date,
    vaultqa_common::{DocumentType, SearchResult},
    vaultqa_config::{LlmProviderKind, StoreBackend, VaultQaConfig},
    vaultqa_memory::{MemoryStatus, SyncReport},
};

/// Characters of chunk text shown per entry in the context listing.
pub const PREVIEW_CHARS: usize = 150;

pub const NO_RESULTS_HINT: &str =
    "No relevant notes found. Run `vaultqa sync` first, or try rephrasing the question.";

fn secret_state(secret: &Option<Secret<String>>) -> &'static str {
    if secret.is_some() { "<redacted>" } else { "<unset>" }
}

/// The effective configuration in TOML layout, with every key replaced by a
/// redaction marker.
pub fn render_config(config: &VaultQaConfig) -> String {
    let mut out = String::new();
    let vault = config
        .vault
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unset>".into());
    let _ = writeln!(out, "[vault]\npath = {vault:?}\n");

    let e = &config.embeddings;
    let _ = writeln!(
        out,
        "[embeddings]\nmodel = {:?}\ndimensions = {}\nbase_url = {:?}\nbatch_size = {}\napi_key = {:?}\n",
        e.model,
        e.dimensions,
        e.base_url,
        e.batch_size,
        secret_state(&e.api_key)
    );

    let l = &config.llm;
    let provider = match l.provider {
        LlmProviderKind::Anthropic => "anthropic",
        LlmProviderKind::OpenAi => "openai",
    };
    let _ = writeln!(
        out,
        "[llm]\nprovider = {provider:?}\nmodel = {:?}\nmax_tokens = {}\napi_key = {:?}",
        l.model,
        l.max_tokens,
        secret_state(&l.api_key)
    );
    if let Some(url) = &l.base_url {
        let _ = writeln!(out, "base_url = {url:?}");
    }
    if l.system_prompt.is_some() {
        let _ = writeln!(out, "system_prompt = \"<custom>\"");
    }
    out.push('\n');

    let s = &config.store;
    let backend = match s.backend {
        StoreBackend::Qdrant => "qdrant",
        StoreBackend::Sqlite => "sqlite",
        StoreBackend::Memory => "memory",
    };
    let _ = writeln!(
        out,
        "[store]\nbackend = {backend:?}\nurl = {:?}\ncollection = {:?}\nsqlite_path = {:?}\napi_key = {:?}\n",
        s.url,
        s.collection,
        s.sqlite_path.display().to_string(),
        secret_state(&s.api_key)
    );

    let _ = writeln!(
        out,
        "[chunking]\nchunk_size = {}\nchunk_overlap = {}\n",
        config.chunking.chunk_size, config.chunking.chunk_overlap
    );
    let _ = write!(out, "[query]\ntop_k = {}\n", config.query.top_k);
    out
}

/// First [`PREVIEW_CHARS`] characters of `text` on one line.
pub fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let mut cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

/// The retrieved notes, one numbered entry each, as shown by `query --show-context`.
pub fn context_listing(results: &[SearchResult]) -> String {
    let mut out = format!("Found {} relevant notes:\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let meta = &result.chunk.metadata;
        let origin = match meta.doc_type {
            DocumentType::Journal => display_date(meta.date.as_deref()),
            DocumentType::Page => "page".to_string(),
        };
        let _ = write!(
            out,
            "\n[{}] {} ({origin}) relevance {:.1}%\n    {}\n",
            i + 1,
            meta.title,
            result.score * 100.0,
            preview(&result.chunk.content)
        );
    }
    out
}

pub fn sync_summary(report: &SyncReport) -> String {
    let mut out = format!(
        "Synced {} of {} notes: {} chunks indexed",
        report.documents_indexed, report.documents_read, report.chunks_indexed
    );
    if report.documents_empty > 0 {
        let _ = write!(out, ", {} empty", report.documents_empty);
    }
    if report.documents_failed > 0 {
        let _ = write!(
            out,
            ", {} failed ({} batches)",
            report.documents_failed, report.batches_failed
        );
    }
    out
}

pub fn status_summary(status: &MemoryStatus) -> String {
    let dims = status
        .dimensions
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown".into());
    format!(
        "Backend:      {}\nCollection:   {}\nChunks:       {}\nDimensions:   {dims}\nEmbeddings:   {} ({})",
        status.backend,
        status.collection,
        status.total_chunks,
        status.embedding_model,
        status.embedding_provider_key
    )
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        vaultqa_common::{Chunk, ChunkMetadata},
    };

    fn hit(doc_type: DocumentType, title: &str, date: Option<&str>, content: &str) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: "id".into(),
                content: content.into(),
                metadata: ChunkMetadata {
                    source: "/v/x.md".into(),
                    doc_type,
                    title: title.into(),
                    date: date.map(str::to_string),
                    page_links: vec![],
                    chunk_index: 0,
                    total_chunks: 1,
                },
            },
            score: 0.4321,
        }
    }

    #[test]
    fn config_never_shows_secrets() {
        let mut config = VaultQaConfig::default();
        config.embeddings.api_key = Some(Secret::new("sk-very-secret".into()));
        let text = render_config(&config);
        assert!(!text.contains("sk-very-secret"));
        assert!(text.contains("api_key = \"<redacted>\""));
        assert!(text.contains("api_key = \"<unset>\""));
        assert!(text.contains("collection = \"logseq-notes\""));
        assert!(text.contains("top_k = 100"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("- a\n\t- b"), "- a - b");
        let long = "é".repeat(200);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn listing_shows_title_date_and_relevance() {
        let text = context_listing(&[
            hit(
                DocumentType::Journal,
                "December 27, 2024",
                Some("2024-12-27T00:00:00Z"),
                "- Session 42",
            ),
            hit(DocumentType::Page, "Caelum", None, "- Wanderer"),
        ]);
        assert!(text.starts_with("Found 2 relevant notes:"));
        assert!(text.contains("[1] December 27, 2024 (December 27, 2024) relevance 43.2%"));
        assert!(text.contains("[2] Caelum (page) relevance 43.2%\n    - Wanderer"));
    }

    #[test]
    fn sync_summary_mentions_failures_only_when_present() {
        let mut report = SyncReport {
            documents_read: 3,
            documents_indexed: 3,
            chunks_indexed: 9,
            ..Default::default()
        };
        assert_eq!(sync_summary(&report), "Synced 3 of 3 notes: 9 chunks indexed");
        report.documents_indexed = 2;
        report.documents_failed = 1;
        report.batches_failed = 1;
        assert_eq!(
            sync_summary(&report),
            "Synced 2 of 3 notes: 9 chunks indexed, 1 failed (1 batches)"
        );
    }
}
