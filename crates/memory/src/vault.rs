//! Reading notes from a vault directory.
//!
//! A vault has `journals/` (one file per day, named `YYYY_MM_DD.md`) and `pages/`
//! (one file per topic). Both are read non-recursively.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::SystemTime,
};

use {
    chrono::NaiveDate,
    regex::Regex,
    tracing::{debug, warn},
    vaultqa_common::{Document, DocumentType, Result},
    walkdir::WalkDir,
};

pub const JOURNALS_DIR: &str = "journals";
pub const PAGES_DIR: &str = "pages";

#[allow(clippy::expect_used)]
static PAGE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("page link pattern is valid"));

#[allow(clippy::expect_used)]
static BLOCK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\(([a-f0-9-]+)\)\)").expect("block ref pattern is valid"));

pub struct VaultReader {
    root: PathBuf,
}

impl VaultReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn journals_dir(&self) -> PathBuf {
        self.root.join(JOURNALS_DIR)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.root.join(PAGES_DIR)
    }

    /// Every journal followed by every page. Unreadable files are logged and skipped.
    pub async fn read_all(&self) -> Vec<Document> {
        let (journals, pages) = tokio::join!(
            self.read_dir(self.journals_dir(), DocumentType::Journal),
            self.read_dir(self.pages_dir(), DocumentType::Page),
        );
        journals.into_iter().chain(pages).collect()
    }

    /// Read specific files. A path under a `journals` directory is a journal,
    /// anything else a page.
    pub async fn read_paths(&self, paths: &[PathBuf]) -> Vec<Document> {
        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            let doc_type = if path.components().any(|c| c.as_os_str() == JOURNALS_DIR) {
                DocumentType::Journal
            } else {
                DocumentType::Page
            };
            match read_document(path, doc_type).await {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to read note"),
            }
        }
        docs
    }

    /// Markdown files in the vault whose modification time is after `since`.
    pub async fn modified_since(&self, since: SystemTime) -> Vec<PathBuf> {
        let mut changed = Vec::new();
        for dir in [self.journals_dir(), self.pages_dir()] {
            for path in markdown_files(&dir) {
                let modified = match tokio::fs::metadata(&path).await.and_then(|m| m.modified()) {
                    Ok(modified) => modified,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to stat note");
                        continue;
                    },
                };
                if modified > since {
                    changed.push(path);
                }
            }
        }
        debug!(count = changed.len(), "found modified notes");
        changed
    }

    async fn read_dir(&self, dir: PathBuf, doc_type: DocumentType) -> Vec<Document> {
        let mut docs = Vec::new();
        for path in markdown_files(&dir) {
            match read_document(&path, doc_type).await {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to read note"),
            }
        }
        debug!(dir = %dir.display(), count = docs.len(), "read notes");
        docs
    }
}

/// `.md` files directly inside `dir`, sorted by name. A missing directory yields
/// nothing.
fn markdown_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "note directory does not exist, skipping");
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to list note directory entry");
                None
            },
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

pub async fn read_document(path: &Path, doc_type: DocumentType) -> Result<Document> {
    let raw = tokio::fs::read_to_string(path).await?;
    Ok(parse_document(path, doc_type, &raw))
}

/// Build a document from raw file text.
///
/// Journals take their date and title from a `YYYY_MM_DD` file stem; pages take
/// their title from a frontmatter `title` key, falling back to the stem.
pub fn parse_document(path: &Path, doc_type: DocumentType, raw: &str) -> Document {
    let filename = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (frontmatter, body) = split_frontmatter(raw);

    let (date, title) = match doc_type {
        DocumentType::Journal => {
            let date = parse_journal_date(&filename);
            let title = date.map(journal_title).unwrap_or_else(|| filename.clone());
            (date, title)
        },
        DocumentType::Page => {
            let title = frontmatter
                .and_then(|yaml| frontmatter_title(path, yaml))
                .unwrap_or_else(|| filename.clone());
            (None, title)
        },
    };

    Document {
        path: path.to_path_buf(),
        filename,
        doc_type,
        date,
        content: body.to_string(),
        title,
        page_links: extract_page_links(body),
        block_refs: extract_block_refs(body),
    }
}

/// Split a leading `---` fenced YAML block from the body.
///
/// Without a closing fence the whole text is body.
pub fn split_frontmatter(raw: &str) -> (Option<&str>, &str) {
    let Some(after_open) = raw
        .strip_prefix("---\n")
        .or_else(|| raw.strip_prefix("---\r\n"))
    else {
        return (None, raw);
    };

    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &after_open[..offset];
            let body = &after_open[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, raw)
}

fn frontmatter_title(path: &Path, yaml: &str) -> Option<String> {
    let value: serde_yaml::Value = match serde_yaml::from_str(yaml) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed frontmatter");
            return None;
        },
    };
    value
        .get("title")
        .and_then(|t| t.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Parse a `YYYY_MM_DD` journal file stem.
pub fn parse_journal_date(stem: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(stem, "%Y_%m_%d").ok()
}

/// Human-readable journal title, e.g. "December 27, 2024".
pub fn journal_title(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Targets of `[[...]]` links, deduplicated in first-seen order.
pub fn extract_page_links(content: &str) -> Vec<String> {
    unique_captures(&PAGE_LINK, content)
}

/// Ids of `((...))` block references, deduplicated in first-seen order.
pub fn extract_block_refs(content: &str) -> Vec<String> {
    unique_captures(&BLOCK_REF, content)
}

fn unique_captures(re: &Regex, content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    re.captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}
