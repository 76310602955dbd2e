//! Retrieval-grounded answering: prompt assembly around retrieved chunks, then a
//! complete or streamed model call.

use std::{ops::ControlFlow, sync::Arc};

use {
    chrono::DateTime,
    futures::StreamExt,
    tracing::{debug, warn},
    vaultqa_common::{DocumentType, Error, Result, SearchResult},
};

use crate::model::{ChatMessage, CompletionRequest, LlmProvider, StreamEvent, Usage};

pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Returned by [`AnswerAgent::answer`] when the model produced no text.
pub const NO_RESPONSE: &str = "No response generated";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant for someone who keeps their notes in a personal outliner vault.

You have access to excerpts from their notes: dated journal entries and topic pages about people, places, projects and ideas.

Your role is to:
1. Answer questions using the provided notes
2. Cite the journal date or page title when you use a piece of information
3. Say so when the notes do not contain enough information
4. Help them recall details, connections and continuity across notes

The notes use outliner syntax:
- [[Page Name]] links to another page
- Indented bullet points are nested under their parent
- Journal entries are dated

Be conversational but precise.";

/// Final text of an answer and the tokens it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub usage: Usage,
}

pub struct AnswerAgent {
    provider: Arc<dyn LlmProvider>,
    system_prompt: String,
    max_tokens: u32,
}

impl AnswerAgent {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    pub fn build_request(&self, question: &str, context: &[SearchResult]) -> CompletionRequest {
        CompletionRequest {
            system: Some(self.system_prompt.clone()),
            messages: vec![ChatMessage::user(user_prompt(question, context))],
            max_tokens: self.max_tokens,
        }
    }

    /// Ask the model and wait for the whole answer.
    pub async fn answer(&self, question: &str, context: &[SearchResult]) -> Result<Answer> {
        let request = self.build_request(question, context);
        let resp = self.provider.complete(&request).await?;
        let text = if resp.text.trim().is_empty() {
            NO_RESPONSE.to_string()
        } else {
            resp.text
        };
        Ok(Answer {
            text,
            usage: resp.usage,
        })
    }

    /// Ask the model and hand each text delta to `on_token` as it arrives.
    ///
    /// Returning [`ControlFlow::Break`] from the callback stops consuming the
    /// stream; the text received so far is returned.
    pub async fn answer_streaming<F>(
        &self,
        question: &str,
        context: &[SearchResult],
        mut on_token: F,
    ) -> Result<Answer>
    where
        F: FnMut(&str) -> ControlFlow<()> + Send,
    {
        let request = self.build_request(question, context);
        let mut stream = self.provider.stream(request);
        let mut text = String::new();
        let mut usage = Usage::default();

        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Delta(delta) => {
                    text.push_str(&delta);
                    if on_token(&delta).is_break() {
                        debug!("answer stream stopped by caller");
                        break;
                    }
                },
                StreamEvent::Done(u) => {
                    usage = u;
                    break;
                },
                StreamEvent::Error(message) => {
                    warn!(provider = self.provider.name(), error = %message, "answer stream failed");
                    return Err(Error::provider(message));
                },
            }
        }

        Ok(Answer { text, usage })
    }
}

/// The user turn: the question, the numbered notes, and the instruction to stay
/// within them.
pub fn user_prompt(question: &str, context: &[SearchResult]) -> String {
    format!(
        "Based on the following notes, please answer this question:\n\n{question}\n\n### Notes:\n\n{}\n\nPlease provide a comprehensive answer based on the notes above. If the notes don't contain enough information, say so.",
        format_context(context)
    )
}

/// Numbered context blocks separated by `---`.
///
/// Each block starts with `[n] Journal Entry: <date>` or `[n] Page: <title>`
/// and the relevance as a percentage, followed by the chunk text.
pub fn format_context(context: &[SearchResult]) -> String {
    context
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let meta = &result.chunk.metadata;
            let source = match meta.doc_type {
                DocumentType::Journal => {
                    format!("Journal Entry: {}", display_date(meta.date.as_deref()))
                },
                DocumentType::Page => format!("Page: {}", meta.title),
            };
            format!(
                "[{}] {source} (Relevance: {:.1}%)\n{}",
                i + 1,
                result.score * 100.0,
                result.chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// "December 27, 2024" for a stored ISO-8601 date, "Unknown date" otherwise.
pub fn display_date(date: Option<&str>) -> String {
    date.and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.date_naive().format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}
