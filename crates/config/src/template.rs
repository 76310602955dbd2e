/// Starter `vaultqa.toml`, printed by `vaultqa config init`.
///
/// Every value shown is the built-in default.
pub const CONFIG_TEMPLATE: &str = r##"# vaultqa configuration
#
# Environment variables override this file: LOGSEQ_PATH, OPENAI_API_KEY,
# EMBEDDING_MODEL, EMBEDDING_DIMENSIONS, ANTHROPIC_API_KEY, CLAUDE_MODEL,
# QDRANT_URL, QDRANT_COLLECTION_NAME, QDRANT_API_KEY, CHUNK_SIZE,
# CHUNK_OVERLAP, TOP_K_RESULTS.

[vault]
# Directory containing journals/ and pages/
# path = "/home/me/notes"

[embeddings]
model = "text-embedding-3-small"
dimensions = 1536
base_url = "https://api.openai.com"
batch_size = 100

[llm]
# "anthropic" or "openai" (any OpenAI-compatible endpoint)
provider = "anthropic"
model = "claude-haiku-4-5-20251001"
max_tokens = 2000
# base_url = "https://api.anthropic.com"
# system_prompt = "You answer questions about my notes."

[store]
# "qdrant", "sqlite" or "memory"
backend = "qdrant"
url = "http://localhost:6333"
collection = "logseq-notes"
sqlite_path = "vaultqa.db"

[chunking]
chunk_size = 800
# Accepted but not applied: chunks never overlap.
chunk_overlap = 200

[query]
top_k = 100
"##;
