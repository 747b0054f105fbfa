//! Incremental server-sent-events parsing for the run stream.

use serde_json::Value;

/// One parsed SSE event: the `event:` field (if any) and the joined
/// `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Splits an SSE byte stream into events. Bytes arrive in arbitrary chunk
/// boundaries; incomplete events stay buffered until the blank-line
/// terminator shows up.
#[derive(Default)]
pub struct SseParser {
    buf: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and drain every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.push_str(&String::from_utf8_lossy(chunk));

        let mut events = Vec::new();
        while let Some(end) = self.buf.find("\n\n") {
            let block: String = self.buf.drain(..end + 2).collect();
            if let Some(event) = parse_block(&block) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_block(block: &str) -> Option<SseEvent> {
    let mut event = None;
    let mut data_lines = Vec::new();

    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
        // comment lines (":...") and unknown fields are skipped
    }

    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseEvent {
        event,
        data: data_lines.join("\n"),
    })
}

/// Pull the concatenated text out of a `thread.message.delta` payload.
/// Returns `None` when the delta carries no text content.
pub fn extract_text_delta(data: &str) -> Result<Option<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(data)?;
    let Some(parts) = value["delta"]["content"].as_array() else {
        return Ok(None);
    };

    let mut text = String::new();
    for part in parts {
        if part["type"].as_str() == Some("text") {
            if let Some(chunk) = part["text"]["value"].as_str() {
                text.push_str(chunk);
            }
        }
    }

    if text.is_empty() { Ok(None) } else { Ok(Some(text)) }
}
