use serde_json::Value;

/// Terminal frame appended by the relay once the upstream stream ends
pub const DONE_FRAME: &[u8] = b"data: {\"done\":true}\n\n";

/// One decoded SSE line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// A token (or chunk of tokens) to append to the accumulated text
    Message(String),
    /// End of the stream
    Done,
    /// Comment, blank line, non-data field or unparseable payload
    Ignored,
}

/// Parse a single line of an SSE body.
///
/// Only `data:` lines carry payloads. `{"done": true}` (or the `[DONE]`
/// marker) ends the stream and `{"message": ".."}` carries text. Malformed
/// payloads are skipped rather than failing the stream.
pub fn parse_frame(line: &str) -> SseFrame {
    let Some(data) = line.strip_prefix("data:") else {
        return SseFrame::Ignored;
    };
    let data = data.strip_prefix(' ').unwrap_or(data).trim();

    if data.is_empty() {
        return SseFrame::Ignored;
    }
    if data == "[DONE]" {
        return SseFrame::Done;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(value) => {
            if value.get("done").and_then(Value::as_bool) == Some(true) {
                return SseFrame::Done;
            }
            match value.get("message") {
                Some(Value::String(message)) => SseFrame::Message(message.clone()),
                _ => SseFrame::Ignored,
            }
        }
        Err(e) => {
            tracing::debug!("Skipping malformed SSE payload: {} ({})", data, e);
            SseFrame::Ignored
        }
    }
}
