use serde::{Deserialize, Serialize};

/// Where one question is in the ask pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskPhase {
    Idle,
    GeneratingSql,
    ExecutingSql,
    GeneratingSummary,
    StreamingSummary,
    Done,
    Failed,
}

impl AskPhase {
    pub fn can_transition_to(self, next: AskPhase) -> bool {
        use AskPhase::*;

        match (self, next) {
            (Idle, GeneratingSql)
            | (GeneratingSql, ExecutingSql)
            | (ExecutingSql, GeneratingSummary)
            | (GeneratingSummary, StreamingSummary)
            // summary could not be started; rows stay visible
            | (GeneratingSummary, Done)
            | (StreamingSummary, Done)
            // fix SQL re-runs execution with edited SQL
            | (Failed, ExecutingSql) => true,
            (from, Failed) => from.is_loading(),
            _ => false,
        }
    }

    /// A step of the pipeline is running
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            AskPhase::GeneratingSql
                | AskPhase::ExecutingSql
                | AskPhase::GeneratingSummary
                | AskPhase::StreamingSummary
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AskPhase::Done | AskPhase::Failed)
    }
}
