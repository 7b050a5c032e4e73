//! Client side of the askdata chat: drives one question through SQL
//! generation, execution and a streamed summary against the HTTP API.

pub mod client;
pub mod consumer;
pub mod error;
pub mod events;
pub mod message;
pub mod orchestrator;
pub mod phase;
pub mod session;

pub use client::{ChatApi, HttpChatApi};
pub use consumer::consume_sse;
pub use error::{FlowError, Result};
pub use events::FlowEvent;
pub use message::{ChatMessage, MessageError};
pub use orchestrator::{InFlight, InFlightGuard, Orchestrator};
pub use phase::AskPhase;
pub use session::{AskHandle, ChatSurface, ThreadSession};
