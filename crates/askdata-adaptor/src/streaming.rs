use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::buffer_utils::{parse_frame, SseFrame, SseLineDecoder};
use crate::error::AdaptorError;

/// Raw body of an upstream SSE response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, AdaptorError>> + Send>>;

/// Turn a reqwest response into a `ByteStream`
pub fn response_bytes(response: reqwest::Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(AdaptorError::from)))
}

/// Decode an SSE body into `Message` and `Done` frames.
///
/// Ignored lines are dropped. The stream ends after the first `Done` frame
/// or when the body ends, whichever comes first; the trailing partial line
/// is flushed at end of body.
pub fn sse_frames(
    body: ByteStream,
) -> Pin<Box<dyn Stream<Item = Result<SseFrame, AdaptorError>> + Send>> {
    Box::pin(async_stream::stream! {
        let mut body = body;
        let mut decoder = SseLineDecoder::with_capacity(4096);

        while let Some(chunk_result) = body.next().await {
            match chunk_result {
                Ok(bytes) => {
                    decoder.extend(&bytes);

                    while let Some(line_result) = decoder.next_line() {
                        match line_result {
                            Ok(line) => match parse_frame(&line) {
                                SseFrame::Ignored => continue,
                                SseFrame::Done => {
                                    yield Ok(SseFrame::Done);
                                    return;
                                }
                                frame => yield Ok(frame),
                            },
                            Err(e) => {
                                tracing::warn!("Dropping undecodable SSE line: {}", e);
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(Ok(line)) = decoder.finish() {
            match parse_frame(&line) {
                SseFrame::Ignored => {}
                frame => yield Ok(frame),
            }
        }
    })
}
