use askdata_types::RunSqlResponse;
use serde::Serialize;

use crate::message::ChatMessage;
use crate::phase::AskPhase;

/// Progress of one ask run, in the order it happens
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    PhaseChanged { phase: AskPhase },

    SqlReady { sql: String },

    RowsReady { result: RunSqlResponse },

    /// Whole summary text so far, sent after every chunk that changed it
    SummaryDelta { text: String },

    /// Whole explanation text so far for a question that has no SQL answer
    ExplanationDelta { text: String },

    Failed {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        fixable: bool,
    },

    /// Final state of the message; always the last event of a run
    Completed { message: Box<ChatMessage> },
}
