//! HTTP runner for the OpenAI Responses API.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::errors::CallError;
use crate::runner::{EventStream, ModelRunner};
use crate::sse::SseParser;
use crate::types::{RawResponse, Request, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT_MS: u64 = 120_000;

pub struct OpenAiResponsesRunner {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenAiResponsesRunner {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, CallError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build from `OPENAI_API_KEY` (and optional `OPENAI_BASE_URL`).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(api_key, base_url).ok()
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.base_url)
    }

    async fn send(&self, request: &Request) -> Result<reqwest::Response, CallError> {
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CallError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ModelRunner for OpenAiResponsesRunner {
    fn name(&self) -> &str {
        "openai-responses"
    }

    async fn complete(&self, mut request: Request) -> Result<RawResponse, CallError> {
        request.stream = false;
        let response = self.send(&request).await?;
        Ok(response.json::<RawResponse>().await?)
    }

    async fn stream(&self, mut request: Request) -> Result<EventStream, CallError> {
        request.stream = true;
        let response = self.send(&request).await?;
        Ok(decode_event_stream(Box::pin(response.bytes_stream())))
    }
}

struct DecodeState {
    bytes: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    parser: SseParser,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

fn decode_event_stream(
    bytes: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
) -> EventStream {
    let state = DecodeState {
        bytes,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let text = String::from_utf8_lossy(&chunk).into_owned();
                    for frame in state.parser.push(&text) {
                        // Frames that do not decode as stream events are
                        // keepalives or newer shapes; skip them.
                        if let Ok(event) = serde_json::from_str::<StreamEvent>(&frame.data) {
                            state.pending.push_back(event);
                        }
                    }
                }
                Some(Err(error)) => {
                    state.done = true;
                    return Some((Err(CallError::Stream(error.to_string())), state));
                }
                None => {
                    state.done = true;
                    if let Some(frame) = state.parser.finish() {
                        if let Ok(event) = serde_json::from_str::<StreamEvent>(&frame.data) {
                            state.pending.push_back(event);
                        }
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StreamEventKind, StreamEventKindOrString};
    use futures::stream;

    fn byte_stream(
        chunks: Vec<Result<Bytes, reqwest::Error>>,
    ) -> Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>> {
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test(flavor = "current_thread")]
    async fn decodes_delta_events_across_chunk_boundaries() {
        let stream = decode_event_stream(byte_stream(vec![
            Ok(Bytes::from_static(
                b"event: response.output_text.delta\ndata: {\"type\":\"respon",
            )),
            Ok(Bytes::from_static(
                b"se.output_text.delta\",\"delta\":\"Hi\"}\n\n",
            )),
        ]));
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().expect("event decodes");
        assert_eq!(
            event.kind,
            StreamEventKindOrString::Known(StreamEventKind::OutputTextDelta)
        );
        assert_eq!(event.delta.as_deref(), Some("Hi"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn skips_frames_that_are_not_stream_events() {
        let stream = decode_event_stream(byte_stream(vec![Ok(Bytes::from_static(
            b"data: not json\n\ndata: {\"type\":\"response.completed\",\"response\":{\"id\":\"r\"}}\n\n",
        ))]));
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().expect("event decodes");
        assert_eq!(
            event.kind,
            StreamEventKindOrString::Known(StreamEventKind::Completed)
        );
    }
}
