//! Anthropic Messages API provider.

use {
    async_trait::async_trait,
    futures::StreamExt,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::{Value, json},
    tracing::debug,
    vaultqa_common::Result,
};

use crate::{
    model::{CompletionRequest, CompletionResponse, EventStream, LlmProvider, StreamEvent, Usage},
    providers::{SseLineResult, check_status, sse_data},
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: Secret<String>,
    model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Token counts accumulated while streaming.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    pub usage: Usage,
}

impl AnthropicProvider {
    pub fn new(api_key: Secret<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.base_url = url.as_ref().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        if self.base_url.ends_with("/v1") {
            format!("{}/messages", self.base_url)
        } else {
            format!("{}/v1/messages", self.base_url)
        }
    }

    fn build_body(&self, request: &CompletionRequest, stream: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });
        if let Some(system) = &request.system {
            body["system"] = json!(system);
        }
        if stream {
            body["stream"] = json!(true);
        }
        body
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let resp = self
            .client
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;
        check_status("anthropic", resp).await
    }
}

/// Process a single SSE data payload from the Messages streaming API.
pub fn process_anthropic_sse_line(data: &str, state: &mut AnthropicStreamState) -> SseLineResult {
    let Ok(evt) = serde_json::from_str::<Value>(data) else {
        return SseLineResult::Skip;
    };

    match evt["type"].as_str().unwrap_or_default() {
        "message_start" => {
            if let Some(n) = evt["message"]["usage"]["input_tokens"].as_u64() {
                state.usage.input_tokens = n as u32;
            }
            SseLineResult::Skip
        },
        "content_block_delta" => {
            let delta = &evt["delta"];
            match (delta["type"].as_str(), delta["text"].as_str()) {
                (Some("text_delta"), Some(text)) if !text.is_empty() => {
                    SseLineResult::Events(vec![StreamEvent::Delta(text.to_string())])
                },
                _ => SseLineResult::Skip,
            }
        },
        "message_delta" => {
            if let Some(n) = evt["usage"]["output_tokens"].as_u64() {
                state.usage.output_tokens = n as u32;
            }
            SseLineResult::Skip
        },
        "message_stop" => SseLineResult::Done,
        "error" => {
            let message = evt["error"]["message"]
                .as_str()
                .unwrap_or("unknown streaming error");
            SseLineResult::Events(vec![StreamEvent::Error(message.to_string())])
        },
        _ => SseLineResult::Skip,
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_body(request, false);
        let resp: MessagesResponse = self.send(&body).await?.json().await?;

        let text = resp
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<String>();
        let usage = resp
            .usage
            .map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            })
            .unwrap_or_default();
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

            let mut state = AnthropicStreamState::default();
            let mut lines = std::pin::pin!(sse_data(resp));
            while let Some(line) = lines.next().await {
                let data = match line {
                    Ok(data) => data,
                    Err(e) => {
                        yield StreamEvent::Error(e.to_string());
                        return;
                    },
                };
                match process_anthropic_sse_line(&data, &mut state) {
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
            yield StreamEvent::Done(state.usage);
        })
    }
}
