use askdata_types::Thread;
use tokio::sync::mpsc;

use crate::error::{FlowError, Result};
use crate::events::FlowEvent;
use crate::message::{ChatMessage, MessageError};
use crate::orchestrator::{InFlight, Orchestrator};
use crate::phase::AskPhase;

/// A started run
pub struct AskHandle {
    /// Thread the question was persisted under, if persisting worked
    pub thread_id: Option<i64>,
    /// Index of the message in its surface
    pub index: usize,
    pub events: mpsc::Receiver<FlowEvent>,
}

fn require_question(question: &str) -> Result<&str> {
    let question = question.trim();
    if question.is_empty() {
        return Err(FlowError::InvalidInput("Question is required".to_string()));
    }
    Ok(question)
}

/// Home surface: every question opens a new thread
pub struct ChatSurface {
    orchestrator: Orchestrator,
    in_flight: InFlight,
}

impl ChatSurface {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            in_flight: InFlight::new(),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Start a question in a new thread.
    ///
    /// Thread and response creation are best-effort; the question still runs
    /// when the store is unavailable.
    pub async fn ask(&self, question: &str) -> Result<AskHandle> {
        let question = require_question(question)?;
        let guard = self
            .in_flight
            .try_acquire()
            .ok_or(FlowError::AlreadyProcessing)?;

        let api = self.orchestrator.api();
        let (thread_id, response_id) = match api.create_thread(question).await {
            Ok(thread) => {
                let response = match api.create_response(thread.id, question, None).await {
                    Ok(response) => Some(response.id),
                    Err(e) => {
                        tracing::warn!("Failed to create response in thread {}: {}", thread.id, e);
                        None
                    }
                };
                (Some(thread.id), response)
            }
            Err(e) => {
                tracing::warn!("Failed to create thread: {}", e);
                (None, None)
            }
        };

        let events =
            self.orchestrator
                .spawn_run(ChatMessage::new(question, response_id), thread_id, guard);

        Ok(AskHandle {
            thread_id,
            index: 0,
            events,
        })
    }
}

/// Messages of one persisted thread
pub struct ThreadSession {
    thread: Thread,
    messages: Vec<ChatMessage>,
    orchestrator: Orchestrator,
    in_flight: InFlight,
    /// One-shot: at most one pending response is started per load
    auto_start_armed: bool,
}

impl ThreadSession {
    pub async fn load(orchestrator: Orchestrator, thread_id: i64) -> Result<Self> {
        let detail = orchestrator.api().get_thread(thread_id).await?;
        let messages = detail.responses.iter().map(ChatMessage::from_response).collect();

        Ok(Self {
            thread: detail.thread,
            messages,
            orchestrator,
            in_flight: InFlight::new(),
            auto_start_armed: true,
        })
    }

    /// Refetch the thread and re-arm the auto-start latch
    pub async fn reload(&mut self) -> Result<()> {
        let detail = self.orchestrator.api().get_thread(self.thread.id).await?;
        self.thread = detail.thread;
        self.messages = detail
            .responses
            .iter()
            .map(ChatMessage::from_response)
            .collect();
        self.auto_start_armed = true;
        Ok(())
    }

    pub fn thread(&self) -> &Thread {
        &self.thread
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.is_busy()
    }

    /// Start the latest pending response, once per load
    pub fn auto_start_pending(&mut self) -> Option<AskHandle> {
        if !self.auto_start_armed {
            return None;
        }
        let index = self.messages.iter().rposition(ChatMessage::is_pending)?;
        let guard = self.in_flight.try_acquire()?;
        self.auto_start_armed = false;

        tracing::info!(
            "Resuming pending response {:?} in thread {}",
            self.messages[index].response_id,
            self.thread.id
        );
        let events = self.orchestrator.spawn_run(
            self.messages[index].clone(),
            Some(self.thread.id),
            guard,
        );

        Some(AskHandle {
            thread_id: Some(self.thread.id),
            index,
            events,
        })
    }

    /// Append a question to the thread and run it
    pub async fn ask(&mut self, question: &str) -> Result<AskHandle> {
        let question = require_question(question)?;
        let guard = self
            .in_flight
            .try_acquire()
            .ok_or(FlowError::AlreadyProcessing)?;

        let response_id = match self
            .orchestrator
            .api()
            .create_response(self.thread.id, question, None)
            .await
        {
            Ok(response) => Some(response.id),
            Err(e) => {
                tracing::warn!("Failed to create response in thread {}: {}", self.thread.id, e);
                None
            }
        };

        let message = ChatMessage::new(question, response_id);
        self.messages.push(message.clone());
        let index = self.messages.len() - 1;

        let events = self
            .orchestrator
            .spawn_run(message, Some(self.thread.id), guard);

        Ok(AskHandle {
            thread_id: Some(self.thread.id),
            index,
            events,
        })
    }

    /// Save edited SQL on a failed message and re-run it from execution
    pub async fn fix_sql(&mut self, index: usize, sql: &str) -> Result<AskHandle> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(FlowError::InvalidInput("SQL is required".to_string()));
        }

        let phase = self
            .messages
            .get(index)
            .ok_or(FlowError::MessageNotFound(index))?
            .phase;
        if !phase.can_transition_to(AskPhase::ExecutingSql) {
            return Err(FlowError::InvalidTransition {
                from: phase,
                to: AskPhase::ExecutingSql,
            });
        }

        let guard = self
            .in_flight
            .try_acquire()
            .ok_or(FlowError::AlreadyProcessing)?;

        if let Some(response_id) = self.messages[index].response_id {
            self.orchestrator
                .api()
                .update_response_sql(self.thread.id, response_id, sql)
                .await?;
        }

        let message = &mut self.messages[index];
        message.sql = Some(sql.to_string());

        let events = self
            .orchestrator
            .spawn_run(message.clone(), Some(self.thread.id), guard);

        Ok(AskHandle {
            thread_id: Some(self.thread.id),
            index,
            events,
        })
    }

    /// Fold a run's event into the local copy of its message
    pub fn apply(&mut self, index: usize, event: &FlowEvent) {
        let Some(message) = self.messages.get_mut(index) else {
            return;
        };

        match event {
            FlowEvent::PhaseChanged { phase } => message.phase = *phase,
            FlowEvent::SqlReady { sql } => message.sql = Some(sql.clone()),
            FlowEvent::RowsReady { result } => message.result = Some(result.clone()),
            FlowEvent::SummaryDelta { text } => message.summary = text.clone(),
            FlowEvent::ExplanationDelta { text } => message.explanation = Some(text.clone()),
            FlowEvent::Failed {
                message: text,
                code,
                fixable,
            } => {
                message.phase = AskPhase::Failed;
                message.error = Some(MessageError {
                    message: text.clone(),
                    code: code.clone(),
                    fixable: *fixable,
                });
            }
            FlowEvent::Completed { message: done } => *message = (**done).clone(),
        }
    }
}
