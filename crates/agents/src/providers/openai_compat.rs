//! OpenAI-compatible chat-completions provider and its SSE line handling.
//!
//! Works with the OpenAI API and any server that speaks the same
//! `/chat/completions` protocol (local model servers, gateways).

use {
    async_trait::async_trait,
    futures::StreamExt,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::debug,
    vaultqa_common::Result,
};

use crate::{
    model::{CompletionRequest, CompletionResponse, EventStream, LlmProvider, StreamEvent, Usage},
    providers::{SseLineResult, check_status, sse_data},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: Option<Secret<String>>,
    model: String,
    base_url: String,
}

/// State carried across SSE lines.
#[derive(Default)]
pub struct StreamingState {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn chat_endpoint(base_url: &str) -> String {
    let normalized = base_url.trim_end_matches('/');
    if normalized.ends_with("/chat/completions") {
        return normalized.to_string();
    }
    if has_version_suffix(normalized) {
        return format!("{normalized}/chat/completions");
    }
    format!("{normalized}/v1/chat/completions")
}

impl OpenAiCompatProvider {
    /// `api_key` may be `None` for local servers that do not check it.
    pub fn new(api_key: Option<Secret<String>>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = url.as_ref().to_string();
        self
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content })),
        );

        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });
        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({ "include_usage": true });
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let mut req = self.client.post(chat_endpoint(&self.base_url)).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }
        check_status("openai-compatible provider", req.send().await?).await
    }
}

/// Process a single SSE data line and return any events to yield.
pub fn process_openai_sse_line(data: &str, state: &mut StreamingState) -> SseLineResult {
    if data == "[DONE]" {
        return SseLineResult::Done;
    }

    let Ok(evt) = serde_json::from_str::<Value>(data) else {
        return SseLineResult::Skip;
    };

    // Usage chunk (sent with stream_options.include_usage)
    if let Some(u) = evt.get("usage").filter(|u| !u.is_null()) {
        state.input_tokens = u["prompt_tokens"].as_u64().unwrap_or(0) as u32;
        state.output_tokens = u["completion_tokens"].as_u64().unwrap_or(0) as u32;
    }

    if let Some(message) = evt["error"]["message"].as_str() {
        return SseLineResult::Events(vec![StreamEvent::Error(message.to_string())]);
    }

    match evt["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => {
            SseLineResult::Events(vec![StreamEvent::Delta(content.to_string())])
        },
        _ => SseLineResult::Skip,
    }
}

/// The final event when the stream ends.
pub fn finalize_stream(state: &StreamingState) -> StreamEvent {
    StreamEvent::Done(Usage {
        input_tokens: state.input_tokens,
        output_tokens: state.output_tokens,
    })
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(request, false);
        let resp: Value = self.send(&body).await?.json().await?;

        let text = resp["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        let usage = Usage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };
        debug!(model = %self.model, input_tokens = usage.input_tokens, output_tokens = usage.output_tokens, "completion finished");

        Ok(CompletionResponse { text, usage })
    }

    fn stream(&self, request: CompletionRequest) -> EventStream<'_> {
        Box::pin(async_stream::stream! {
            let body = self.build_body(&request, true);
            let resp = match self.send(&body).await {
                Ok(resp) => resp,
                Err(e) => {
                    yield StreamEvent::Error(e.to_string());
                    return;
                },
            };

            let mut state = StreamingState::default();
            let mut lines = std::pin::pin!(sse_data(resp));
            while let Some(line) = lines.next().await {
                let data = match line {
                    Ok(data) => data,
                    Err(e) => {
                        yield StreamEvent::Error(e.to_string());
                        return;
                    },
                };
                match process_openai_sse_line(&data, &mut state) {
                    SseLineResult::Skip => {},
                    SseLineResult::Done => break,
                    SseLineResult::Events(events) => {
                        for event in events {
                            let failed = matches!(event, StreamEvent::Error(_));
                            yield event;
                            if failed {
                                return;
                            }
                        }
                    },
                }
            }
            yield finalize_stream(&state);
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::model::ChatMessage, mockito::Matcher};

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: Some("system prompt".into()),
            messages: vec![ChatMessage::user("question")],
            max_tokens: 100,
        }
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(
            chat_endpoint("https://api.openai.com"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:11434/v1/"),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("https://gw.example.com/v1/chat/completions"),
            "https://gw.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn system_prompt_becomes_first_message() {
        let p = OpenAiCompatProvider::new(None, "gpt-test");
        let body = p.build_body(&request(), true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "question");
        assert_eq!(body["stream_options"]["include_usage"], true);
    }

    #[test]
    fn test_process_sse_done() {
        let mut state = StreamingState::default();
        assert!(matches!(
            process_openai_sse_line("[DONE]", &mut state),
            SseLineResult::Done
        ));
    }

    #[test]
    fn test_process_sse_text_delta() {
        let mut state = StreamingState::default();
        let data = r#"{"choices":[{"delta":{"content":"Hello"}}]}"#;
        let result = process_openai_sse_line(data, &mut state);
        match result {
            SseLineResult::Events(events) => {
                assert_eq!(events.len(), 1);
                assert!(matches!(&events[0], StreamEvent::Delta(s) if s == "Hello"));
            },
            _ => panic!("Expected Events"),
        }
    }

    #[test]
    fn test_process_sse_role_only_chunk_is_skipped() {
        let mut state = StreamingState::default();
        let data = r#"{"choices":[{"delta":{"role":"assistant","content":""}}]}"#;
        assert!(matches!(
            process_openai_sse_line(data, &mut state),
            SseLineResult::Skip
        ));
    }

    #[test]
    fn test_finalize_stream() {
        let mut state = StreamingState::default();
        let usage = r#"{"choices":[],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#;
        let _ = process_openai_sse_line(usage, &mut state);

        assert!(matches!(
            finalize_stream(&state),
            StreamEvent::Done(usage) if usage.input_tokens == 10 && usage.output_tokens == 5
        ));
    }

    #[tokio::test]
    async fn stream_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let sse = [
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"The "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"ruins."}}]}"#,
            r#"data: {"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":2}}"#,
            "data: [DONE]",
            "",
        ]
        .join("\n\n");
        server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({ "model": "gpt-test", "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse)
            .create_async()
            .await;

        let p = OpenAiCompatProvider::new(Some(Secret::new("sk-test".into())), "gpt-test")
            .with_base_url(server.url());
        let events: Vec<StreamEvent> = p.stream(request()).collect().await;
        assert_eq!(events, vec![
            StreamEvent::Delta("The ".into()),
            StreamEvent::Delta("ruins.".into()),
            StreamEvent::Done(Usage {
                input_tokens: 3,
                output_tokens: 2
            }),
        ]);
    }

    #[tokio::test]
    async fn complete_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{ "message": { "role": "assistant", "content": "An answer." } }],
                    "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let p = OpenAiCompatProvider::new(None, "gpt-test").with_base_url(server.url());
        let resp = p.complete(&request()).await.unwrap();
        assert_eq!(resp.text, "An answer.");
        assert_eq!(resp.usage.input_tokens, 12);
    }
}
