mod buffering;
mod sse_parser;

pub use buffering::SseLineDecoder;
pub use sse_parser::{parse_frame, SseFrame, DONE_FRAME};
