use askdata_types::{AnswerStatus, RunSqlResponse, ThreadResponse};
use serde::Serialize;

use crate::error::{FlowError, Result};
use crate::phase::AskPhase;

/// Error shown under a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The SQL is shown with an edit affordance and can be re-run
    pub fixable: bool,
}

/// One question and everything produced for it
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Persisted thread response backing this message, if any
    pub response_id: Option<i64>,
    pub question: String,
    pub sql: Option<String>,
    pub phase: AskPhase,
    pub result: Option<RunSqlResponse>,
    pub summary: String,
    /// Explanation streamed for a question that has no SQL answer
    pub explanation: Option<String>,
    pub error: Option<MessageError>,
}

impl ChatMessage {
    pub fn new(question: impl Into<String>, response_id: Option<i64>) -> Self {
        Self {
            response_id,
            question: question.into(),
            sql: None,
            phase: AskPhase::Idle,
            result: None,
            summary: String::new(),
            explanation: None,
            error: None,
        }
    }

    /// Rebuild a message from its stored response
    pub fn from_response(response: &ThreadResponse) -> Self {
        let mut message = Self::new(response.question.clone(), Some(response.id));
        message.sql = response.sql.clone();

        let answer = response.answer_detail.as_ref();
        message.phase = match answer.map(|a| a.status) {
            Some(AnswerStatus::Finished) => AskPhase::Done,
            Some(AnswerStatus::Failed) | Some(AnswerStatus::Interrupted) => AskPhase::Failed,
            _ if message.sql.is_some() => AskPhase::Done,
            _ => AskPhase::Idle,
        };

        if let Some(content) = answer.and_then(|a| a.content.clone()) {
            if message.phase == AskPhase::Failed {
                message.error = Some(MessageError {
                    message: content,
                    code: None,
                    fixable: message.sql.is_some(),
                });
            } else {
                message.summary = content;
            }
        } else if message.phase == AskPhase::Failed {
            message.error = Some(MessageError {
                message: "Answer generation failed".to_string(),
                code: None,
                fixable: message.sql.is_some(),
            });
        }

        message
    }

    /// Persisted, SQL-less and untouched: waiting for its first run
    pub fn is_pending(&self) -> bool {
        self.response_id.is_some()
            && self.sql.is_none()
            && self.error.is_none()
            && self.phase == AskPhase::Idle
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn advance(&mut self, next: AskPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(FlowError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Record a failure; SQL and rows already produced are kept
    pub fn fail(&mut self, error: &FlowError, fixable: bool) {
        self.phase = AskPhase::Failed;
        self.error = Some(MessageError {
            message: error.to_string(),
            code: error.code().map(str::to_string),
            fixable,
        });
    }
}
