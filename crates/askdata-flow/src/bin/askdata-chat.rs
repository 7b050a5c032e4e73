//! askdata-chat: ask questions about your data from the terminal.
//!
//! Usage:
//!   askdata-chat ask "revenue by month"
//!   askdata-chat threads
//!   askdata-chat thread 12                 # show and resume a pending question
//!   askdata-chat thread 12 --ask "and by region?"
//!   askdata-chat thread 12 --fix 0 --sql "SELECT ..."

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use askdata_flow::{
    AskPhase, ChatMessage, ChatSurface, FlowEvent, HttpChatApi, Orchestrator, ThreadSession,
};

#[derive(Parser)]
#[command(name = "askdata-chat", about = "Ask questions about your data")]
struct Cli {
    /// Base URL of the askdata API
    #[arg(long, env = "ASKDATA_SERVER", default_value = "http://localhost:3000")]
    server: String,

    /// Language of generated answers
    #[arg(long, env = "ASKDATA_LANGUAGE")]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask a question in a new thread
    Ask { question: String },
    /// List threads
    Threads,
    /// Show a thread and resume its pending question
    Thread {
        id: i64,
        /// Ask a follow-up question in this thread
        #[arg(long)]
        ask: Option<String>,
        /// Re-run the message at this index with the SQL given by --sql
        #[arg(long, requires = "sql")]
        fix: Option<usize>,
        /// Corrected SQL for --fix
        #[arg(long, requires = "fix")]
        sql: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let api = Arc::new(HttpChatApi::new(&cli.server)?);
    let mut orchestrator = Orchestrator::new(api);
    if let Some(language) = cli.language {
        orchestrator = orchestrator.with_language(language);
    }

    match cli.command {
        Command::Ask { question } => {
            let surface = ChatSurface::new(orchestrator);
            let handle = surface.ask(&question).await?;
            if let Some(thread_id) = handle.thread_id {
                println!("thread {}", thread_id);
            }
            let hint = fix_hint(handle.thread_id, handle.index);
            render(handle.events, hint.as_deref(), |_| {}).await;
        }
        Command::Threads => {
            let threads = orchestrator.api().list_threads().await?;
            if threads.is_empty() {
                println!("no threads yet");
            }
            for thread in threads {
                println!(
                    "{:>6}  {}  {}",
                    thread.id,
                    thread.updated_at.format("%Y-%m-%d %H:%M"),
                    thread.summary
                );
            }
        }
        Command::Thread { id, ask, fix, sql } => {
            let mut session = ThreadSession::load(orchestrator, id).await?;
            println!("# {}", session.thread().summary);
            for (index, message) in session.messages().iter().enumerate() {
                print_message(index, message);
            }

            if let Some(handle) = session.auto_start_pending() {
                let index = handle.index;
                println!("\n[{}] > {}", index, session.messages()[index].question);
                let hint = fix_hint(Some(id), index);
                render(handle.events, hint.as_deref(), |event| session.apply(index, event)).await;
            }

            if let (Some(index), Some(sql)) = (fix, sql) {
                let handle = session.fix_sql(index, &sql).await?;
                println!("\n[{}] > {}", index, session.messages()[index].question);
                let hint = fix_hint(Some(id), index);
                render(handle.events, hint.as_deref(), |event| session.apply(index, event)).await;
            }

            if let Some(question) = ask {
                let handle = session.ask(&question).await?;
                let index = handle.index;
                println!("\n[{}] > {}", index, question);
                let hint = fix_hint(Some(id), index);
                render(handle.events, hint.as_deref(), |event| session.apply(index, event)).await;
            }
        }
    }

    Ok(())
}

fn print_message(index: usize, message: &ChatMessage) {
    println!("\n[{}] > {}", index, message.question);
    if let Some(sql) = &message.sql {
        println!("{}", sql);
    }
    if !message.summary.is_empty() {
        println!("{}", message.summary);
    }
    if let Some(error) = &message.error {
        println!("error: {}", error.message);
    }
    if message.phase == AskPhase::Idle {
        println!("(pending)");
    }
}

/// Command line that re-runs a message with corrected SQL
fn fix_hint(thread_id: Option<i64>, index: usize) -> Option<String> {
    thread_id.map(|id| {
        format!(
            "askdata-chat thread {} --fix {} --sql \"<corrected SQL>\"",
            id, index
        )
    })
}

/// Print a run as it happens; streamed text is written incrementally
async fn render<F>(
    mut events: mpsc::Receiver<FlowEvent>,
    fix_command: Option<&str>,
    mut on_event: F,
) where
    F: FnMut(&FlowEvent),
{
    let mut printed = 0;
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        on_event(&event);

        match &event {
            FlowEvent::PhaseChanged { phase } => match phase {
                AskPhase::GeneratingSql => eprintln!("generating SQL..."),
                AskPhase::ExecutingSql => eprintln!("running SQL..."),
                AskPhase::GeneratingSummary => eprintln!("summarizing..."),
                AskPhase::StreamingSummary => printed = 0,
                _ => {}
            },
            FlowEvent::SqlReady { sql } => println!("\n{}\n", sql),
            FlowEvent::RowsReady { result } => {
                println!("{} rows", result.total_rows);
                for record in result.records.iter().take(10) {
                    println!("  {}", serde_json::Value::Object(record.clone()));
                }
                println!();
            }
            FlowEvent::SummaryDelta { text } | FlowEvent::ExplanationDelta { text } => {
                // Text only grows, so the printed prefix ends on a char boundary
                if let Some(tail) = text.get(printed..) {
                    print!("{}", tail);
                    let _ = stdout.flush();
                }
                printed = text.len();
            }
            FlowEvent::Failed { message, fixable, .. } => {
                println!("\nerror: {}", message);
                if let (true, Some(hint)) = (*fixable, fix_command) {
                    println!("(fix the SQL above and re-run it: {})", hint);
                }
            }
            FlowEvent::Completed { .. } => {
                println!();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_fix_parses_index_and_sql() {
        let cli = Cli::try_parse_from([
            "askdata-chat",
            "thread",
            "12",
            "--fix",
            "1",
            "--sql",
            "SELECT 2",
        ])
        .unwrap();

        match cli.command {
            Command::Thread { id, fix, sql, ask } => {
                assert_eq!(id, 12);
                assert_eq!(fix, Some(1));
                assert_eq!(sql.as_deref(), Some("SELECT 2"));
                assert!(ask.is_none());
            }
            _ => panic!("expected thread command"),
        }
    }

    #[test]
    fn test_thread_fix_requires_sql() {
        assert!(Cli::try_parse_from(["askdata-chat", "thread", "12", "--fix", "1"]).is_err());
        assert!(Cli::try_parse_from(["askdata-chat", "thread", "12", "--sql", "SELECT 2"]).is_err());
    }

    #[test]
    fn test_fix_hint_names_the_fix_command() {
        assert_eq!(
            fix_hint(Some(12), 1).as_deref(),
            Some("askdata-chat thread 12 --fix 1 --sql \"<corrected SQL>\"")
        );
        assert!(fix_hint(None, 0).is_none());
    }
}
