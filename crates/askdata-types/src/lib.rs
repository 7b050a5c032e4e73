pub mod api;
pub mod codes;
pub mod thread;

pub use api::*;
pub use codes::ErrorCode;
pub use thread::{
    AnswerDetail, AnswerStatus, ChartDetail, Thread, ThreadDetail, ThreadResponse,
};
