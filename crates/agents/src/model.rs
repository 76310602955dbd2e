use std::pin::Pin;

use {
    async_trait::async_trait,
    futures::Stream,
    vaultqa_common::Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single model call: optional system prompt plus the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Concatenated text blocks; empty when the model produced none.
    pub text: String,
    pub usage: Usage,
}

/// Events yielded by [`LlmProvider::stream`]. `Done` or `Error` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done(Usage),
    Error(String),
}

pub type EventStream<'a> = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name, e.g. "anthropic".
    fn name(&self) -> &str;

    /// Model identifier sent with each request.
    fn id(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    /// Stream the completion as text deltas. Dropping the stream abandons the
    /// request.
    fn stream(&self, request: CompletionRequest) -> EventStream<'_>;
}
