//! Stream collector that folds an event stream into one response.

use crate::types::{RawResponse, StreamEvent, StreamEventKind, StreamEventKindOrString};

/// Accumulates text deltas in arrival order and retains the completed
/// response when the stream carries one. Event kinds it does not
/// recognize are ignored.
#[derive(Debug, Default)]
pub struct StreamCollector {
    response_id: Option<String>,
    text: String,
    completed: Option<RawResponse>,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event in. Returns the delta the event carried, if any,
    /// so the caller can surface it as it arrives. Empty deltas are
    /// returned but leave the accumulated text unchanged.
    pub fn process(&mut self, event: &StreamEvent) -> Option<&str> {
        match &event.kind {
            StreamEventKindOrString::Known(StreamEventKind::Created) => {
                if let Some(response) = &event.response {
                    self.response_id = Some(response.id.clone());
                }
                None
            }
            StreamEventKindOrString::Known(StreamEventKind::OutputTextDelta) => {
                let delta = event.delta.as_deref().unwrap_or_default();
                self.text.push_str(delta);
                let accumulated = self.text.len();
                Some(&self.text[accumulated - delta.len()..])
            }
            StreamEventKindOrString::Known(StreamEventKind::Completed)
            | StreamEventKindOrString::Known(StreamEventKind::Failed) => {
                if let Some(response) = &event.response {
                    self.completed = Some(response.clone());
                }
                None
            }
            StreamEventKindOrString::Other(_) => None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The completed response if one arrived, otherwise a response
    /// synthesized from the accumulated text and the last seen id.
    pub fn response(&self) -> RawResponse {
        if let Some(response) = &self.completed {
            return response.clone();
        }

        RawResponse {
            id: self.response_id.clone().unwrap_or_default(),
            output_text: if self.text.is_empty() {
                None
            } else {
                Some(self.text.clone())
            },
            ..RawResponse::default()
        }
    }
}
