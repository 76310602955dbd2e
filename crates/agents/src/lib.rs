//! Answer generation over retrieved notes.
//!
//! [`model::LlmProvider`] is the seam to the language model; [`providers`] holds the
//! Anthropic and OpenAI-compatible implementations. [`answer::AnswerAgent`] turns a
//! question plus ranked chunks into a prompt and returns or streams the reply.

pub mod answer;
pub mod model;
pub mod providers;

pub use {
    answer::{Answer, AnswerAgent, DEFAULT_SYSTEM_PROMPT, NO_RESPONSE},
    model::{
        ChatMessage, CompletionRequest, CompletionResponse, EventStream, LlmProvider, Role,
        StreamEvent, Usage,
    },
    providers::{anthropic::AnthropicProvider, openai_compat::OpenAiCompatProvider},
};
