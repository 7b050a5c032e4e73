use askdata_types::{
    AnswerDetail, AnswerStatus, ErrorCode, GenerateSqlRequest, GenerateSummaryRequest,
    RunSqlRequest,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::client::ChatApi;
use crate::consumer::consume_sse;
use crate::error::{FlowError, Result};
use crate::events::FlowEvent;
use crate::message::ChatMessage;
use crate::phase::AskPhase;

/// One-question-at-a-time flag shared by a surface and its running ask
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicBool>);

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<InFlightGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(Arc::clone(&self.0)))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag when the run ends, however it ends
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives a message through SQL generation, execution and the summary stream
#[derive(Clone)]
pub struct Orchestrator {
    api: Arc<dyn ChatApi>,
    language: Option<String>,
}

impl Orchestrator {
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self {
            api,
            language: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn api(&self) -> &Arc<dyn ChatApi> {
        &self.api
    }

    /// Spawn the run in background, return its event receiver
    ///
    /// The guard is held until the run finishes.
    pub fn spawn_run(
        &self,
        message: ChatMessage,
        thread_id: Option<i64>,
        guard: InFlightGuard,
    ) -> mpsc::Receiver<FlowEvent> {
        let (tx, rx) = mpsc::channel(1000);
        let orchestrator = self.clone();

        tokio::spawn(async move {
            orchestrator.run(message, thread_id, &tx).await;
            // Release before closing so a drained receiver sees an idle surface
            drop(guard);
            drop(tx);
        });

        rx
    }

    /// Run to completion. `Completed` is always the last event sent.
    ///
    /// An `Idle` message starts at SQL generation. A `Failed` message that
    /// carries SQL is re-executed with that SQL.
    pub async fn run(
        &self,
        mut message: ChatMessage,
        thread_id: Option<i64>,
        events: &mpsc::Sender<FlowEvent>,
    ) -> ChatMessage {
        if let Err(e) = self.drive(&mut message, thread_id, events).await {
            let fixable = message.sql.is_some()
                && matches!(message.phase, AskPhase::GeneratingSql | AskPhase::ExecutingSql);
            tracing::warn!("Ask failed in {:?}: {}", message.phase, e);

            message.fail(&e, fixable);
            emit(
                events,
                FlowEvent::Failed {
                    message: e.to_string(),
                    code: e.code().map(str::to_string),
                    fixable,
                },
            )
            .await;
        }

        emit(
            events,
            FlowEvent::Completed {
                message: Box::new(message.clone()),
            },
        )
        .await;
        message
    }

    async fn drive(
        &self,
        message: &mut ChatMessage,
        thread_id: Option<i64>,
        events: &mpsc::Sender<FlowEvent>,
    ) -> Result<()> {
        let thread_key = thread_id.map(|id| id.to_string());

        if message.phase == AskPhase::Failed {
            message.error = None;
            message.result = None;
            message.summary.clear();
        } else {
            enter(message, AskPhase::GeneratingSql, events).await?;
            let sql = self.generate_sql(message, thread_key.clone(), events).await?;
            message.sql = Some(sql.clone());
            emit(events, FlowEvent::SqlReady { sql }).await;
        }

        let sql = message.sql.clone().ok_or(FlowError::NoSql)?;

        // Execute
        enter(message, AskPhase::ExecutingSql, events).await?;
        let result = self
            .api
            .run_sql(&RunSqlRequest {
                sql: sql.clone(),
                thread_id: thread_key.clone(),
                limit: None,
            })
            .await?;
        self.persist_sql(thread_id, message.response_id, &sql).await;
        message.result = Some(result.clone());
        emit(events, FlowEvent::RowsReady { result }).await;

        // Summarize
        enter(message, AskPhase::GeneratingSummary, events).await?;
        let summary = self
            .api
            .generate_summary(&GenerateSummaryRequest {
                question: message.question.clone(),
                sql,
                sample_size: None,
                language: self.language.clone(),
                thread_id: thread_key,
            })
            .await;
        let summary = match summary {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Summary could not be started: {}", e);
                return enter(message, AskPhase::Done, events).await;
            }
        };

        enter(message, AskPhase::StreamingSummary, events).await?;
        let body = self
            .api
            .stream_summary(&summary.explanation_query_id)
            .await?;
        // Deltas carry the whole text, so a full channel only skips a redraw
        let text = consume_sse(body, |text| {
            let _ = events.try_send(FlowEvent::SummaryDelta {
                text: text.to_string(),
            });
        })
        .await?;
        message.summary = text;

        self.persist_answer(thread_id, message.response_id, &message.summary)
            .await;
        enter(message, AskPhase::Done, events).await
    }

    async fn generate_sql(
        &self,
        message: &mut ChatMessage,
        thread_key: Option<String>,
        events: &mpsc::Sender<FlowEvent>,
    ) -> Result<String> {
        let generated = self
            .api
            .generate_sql(&GenerateSqlRequest {
                question: message.question.clone(),
                thread_id: thread_key,
                language: self.language.clone(),
                return_sql_dialect: false,
            })
            .await;

        match generated {
            Ok(response) if !response.sql.trim().is_empty() => Ok(response.sql),
            Ok(_) => Err(FlowError::NoSql),
            Err(e) => {
                if e.is(ErrorCode::NonSqlQuery) {
                    if let Some(query_id) = e.explanation_query_id() {
                        self.explain(message, query_id, events).await;
                    }
                }
                // Rejected SQL is shown so the user can fix it
                if let Some(sql) = e.invalid_sql() {
                    message.sql = Some(sql.to_string());
                    emit(events, FlowEvent::SqlReady { sql: sql.to_string() }).await;
                }
                Err(e)
            }
        }
    }

    /// Stream the explanation of a non-SQL question into the message
    async fn explain(&self, message: &mut ChatMessage, query_id: &str, events: &mpsc::Sender<FlowEvent>) {
        let body = match self.api.stream_explanation(query_id).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to open explanation stream {}: {}", query_id, e);
                return;
            }
        };

        let explained = consume_sse(body, |text| {
            let _ = events.try_send(FlowEvent::ExplanationDelta {
                text: text.to_string(),
            });
        })
        .await;

        match explained {
            Ok(text) if !text.is_empty() => message.explanation = Some(text),
            Ok(_) => {}
            Err(e) => tracing::warn!("Explanation stream {} failed: {}", query_id, e),
        }
    }

    async fn persist_sql(&self, thread_id: Option<i64>, response_id: Option<i64>, sql: &str) {
        let (Some(thread_id), Some(response_id)) = (thread_id, response_id) else {
            return;
        };
        if let Err(e) = self
            .api
            .update_response_sql(thread_id, response_id, sql)
            .await
        {
            tracing::warn!("Failed to save SQL of response {}: {}", response_id, e);
        }
    }

    async fn persist_answer(&self, thread_id: Option<i64>, response_id: Option<i64>, text: &str) {
        if text.is_empty() {
            return;
        }
        let (Some(thread_id), Some(response_id)) = (thread_id, response_id) else {
            return;
        };
        let answer = AnswerDetail {
            status: AnswerStatus::Finished,
            content: Some(text.to_string()),
        };
        if let Err(e) = self
            .api
            .update_response_answer(thread_id, response_id, answer)
            .await
        {
            tracing::warn!("Failed to save answer of response {}: {}", response_id, e);
        }
    }
}

async fn enter(
    message: &mut ChatMessage,
    phase: AskPhase,
    events: &mpsc::Sender<FlowEvent>,
) -> Result<()> {
    message.advance(phase)?;
    emit(events, FlowEvent::PhaseChanged { phase }).await;
    Ok(())
}

/// Nobody listening is fine; the run still finishes and persists
async fn emit(events: &mpsc::Sender<FlowEvent>, event: FlowEvent) {
    let _ = events.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_is_exclusive_until_guard_drops() {
        let flag = InFlight::new();

        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }
}
