//! Server-Sent Events framing shared by the server and its clients.
//!
//! A frame on the wire looks like:
//!
//! ```text
//! event: product_created
//! data: {"id":1}
//!
//! ```
//!
//! * The `event:` line is optional (unnamed frames are plain messages).
//! * Every line of the payload gets its own `data:` line, so multi-line
//!   string payloads survive the framing.
//! * `null` payloads produce a single empty `data:` line.
//! * Lines starting with `:` are comments. The server uses them for
//!   keep-alives (`: ping`) and for server-side closes (`: closing`).

use serde_json::Value;
use std::borrow::Cow;

/// Keep-alive frame written on idle connections.
pub const PING_FRAME: &str = ": ping\n\n";

/// Frame written right before the server closes a connection.
pub const CLOSING_FRAME: &str = ": closing\n\n";

/// Prefix of the acknowledgement message sent as the first frame.
pub const CONNECTED_PREFIX: &str = "connected:";

/// Encode a single SSE frame.
///
/// Strings are written as-is; numbers and booleans use their JSON text;
/// objects and arrays are serialized to compact JSON. `event` must not
/// contain line breaks.
pub fn encode_frame(event: Option<&str>, data: &Value) -> String {
    let mut out = String::new();
    if let Some(event) = event.filter(|e| !e.is_empty()) {
        out.push_str("event: ");
        out.push_str(event);
        out.push('\n');
    }

    let payload: Cow<'_, str> = match data {
        Value::Null => {
            out.push_str("data: \n\n");
            return out;
        }
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    };

    for line in payload.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        out.push_str("data: ");
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Encode a comment frame (`: {text}`), ignored by conforming clients.
pub fn encode_comment(text: &str) -> String {
    format!(": {text}\n\n")
}

/// The acknowledgement frame sent when a stream is opened.
pub fn connected_frame(connection_id: &str) -> String {
    encode_frame(
        None,
        &Value::String(format!("{CONNECTED_PREFIX}{connection_id}")),
    )
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// A decoded item from an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseMessage {
    /// A dispatched message. `event` is `None` for unnamed frames.
    Event { event: Option<String>, data: String },
    /// A comment line, without the leading colon and space.
    Comment(String),
}

impl SseMessage {
    /// Returns `true` for keep-alive comments.
    pub fn is_ping(&self) -> bool {
        matches!(self, SseMessage::Comment(text) if text == "ping")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SseDecodeError {
    #[error("event stream line is not valid utf-8")]
    InvalidUtf8,
}

/// Incremental decoder for the framing produced by [`encode_frame`].
///
/// Feed it arbitrary byte chunks (frames may be split anywhere) and it
/// returns every message completed by that chunk.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return the messages it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseMessage>, SseDecodeError> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8(line).map_err(|_| SseDecodeError::InvalidUtf8)?;
            if let Some(message) = self.process_line(&line) {
                out.push(message);
            }
        }

        Ok(out)
    }

    fn process_line(&mut self, line: &str) -> Option<SseMessage> {
        if line.is_empty() {
            let event = self.event.take();
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(SseMessage::Event { event, data });
        }

        if let Some(comment) = line.strip_prefix(':') {
            let comment = comment.strip_prefix(' ').unwrap_or(comment);
            return Some(SseMessage::Comment(comment.to_owned()));
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            // id / retry are not used by this protocol.
            _ => {}
        }
        None
    }
}
