//! LLM provider implementations and the SSE plumbing they share.

pub mod anthropic;
pub mod openai_compat;

use {
    futures::{Stream, StreamExt},
    vaultqa_common::{Error, Result},
};

use crate::model::StreamEvent;

/// Result of processing a single SSE data payload.
pub enum SseLineResult {
    /// No actionable event (keep-alive, metadata, unknown type)
    Skip,
    /// Stream is done
    Done,
    /// Events to yield
    Events(Vec<StreamEvent>),
}

/// Turn a non-2xx response into [`Error::Api`], otherwise hand it back.
pub(crate) async fn check_status(
    service: &'static str,
    resp: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Api {
        service,
        status: status.as_u16(),
        body,
    })
}

/// Payloads of the `data:` lines of a server-sent-events body, in order.
///
/// Lines are split on raw bytes so multi-byte characters cut across network
/// chunks decode intact.
pub(crate) fn sse_data(resp: reqwest::Response) -> impl Stream<Item = Result<String>> + Send {
    async_stream::try_stream! {
        let mut bytes = std::pin::pin!(resp.bytes_stream());
        let mut buf: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            buf.extend_from_slice(&chunk?);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                if let Some(data) = data_payload(&line) {
                    yield data;
                }
            }
        }
        if let Some(data) = data_payload(&buf) {
            yield data;
        }
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim().strip_prefix("data:")?.trim_start();
    (!data.is_empty()).then(|| data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_payload_strips_prefix() {
        assert_eq!(data_payload(b"data: {\"a\":1}\n").as_deref(), Some("{\"a\":1}"));
        assert_eq!(data_payload(b"data:[DONE]\r\n").as_deref(), Some("[DONE]"));
        assert_eq!(data_payload(b"event: ping\n"), None);
        assert_eq!(data_payload(b": keep-alive\n"), None);
        assert_eq!(data_payload(b"data: \n"), None);
        assert_eq!(data_payload("data: héllo\n".as_bytes()).as_deref(), Some("héllo"));
    }
}
