use askdata_adaptor::{sse_frames, ByteStream, SseFrame};
use futures::StreamExt;

use crate::error::Result;

/// Read an SSE body and accumulate its `message` fields.
///
/// `on_text` gets the whole text so far after every frame that changed it.
/// Stops at the done frame, or at end of body. Malformed lines are skipped;
/// a transport error mid-stream is returned.
pub async fn consume_sse<F>(body: ByteStream, mut on_text: F) -> Result<String>
where
    F: FnMut(&str),
{
    let mut frames = sse_frames(body);
    let mut text = String::new();

    while let Some(frame) = frames.next().await {
        match frame? {
            SseFrame::Message(chunk) => {
                if chunk.is_empty() {
                    continue;
                }
                text.push_str(&chunk);
                on_text(&text);
            }
            SseFrame::Done => break,
            SseFrame::Ignored => {}
        }
    }

    Ok(text)
}
