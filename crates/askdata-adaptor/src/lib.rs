pub mod ai;
pub mod buffer_utils;
pub mod engine;
pub mod error;
pub mod poller;
pub mod streaming;

pub use ai::{
    AiError, AnalyticsAi, AskCandidate, AskConfigurations, AskHistory, AskInput, AskResult,
    AskResultType, AskStatus, AsyncQuery, ChartInput, ChartResponse, ChartResult, ChartStatus,
    HttpAnalyticsAi, TextBasedAnswerInput, TextBasedAnswerResult, TextBasedAnswerStatus,
};
pub use buffer_utils::{parse_frame, SseFrame, SseLineDecoder, DONE_FRAME};
pub use engine::{EngineQuery, HttpQueryEngine, QueryEngine, QueryResult};
pub use error::AdaptorError;
pub use poller::{PollError, TaskPhase, TaskPoller, TaskState};
pub use streaming::{response_bytes, sse_frames, ByteStream};
