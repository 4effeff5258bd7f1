//! Incremental Server-Sent Events parser for streamed responses.

/// A parsed SSE frame. The Responses stream only uses `event` and `data`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }
}

/// Accepts byte-chunk text and yields completed frames.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    current: SseFrame,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return any frames completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<SseFrame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);

            if line.is_empty() {
                if !self.current.is_empty() {
                    frames.push(std::mem::take(&mut self.current));
                }
                continue;
            }

            // Comment lines keep the connection alive; nothing to record.
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => self.current.event = Some(value.to_string()),
                "data" => {
                    if !self.current.data.is_empty() {
                        self.current.data.push('\n');
                    }
                    self.current.data.push_str(value);
                }
                _ => {}
            }
        }

        frames
    }

    /// Flush the trailing frame when the stream ends without a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.buffer.is_empty() {
            let remainder = std::mem::take(&mut self.buffer);
            self.push(&format!("{}\n", remainder.trim_end_matches(['\r', '\n'])));
        }
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}
