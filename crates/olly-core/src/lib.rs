//! Core of the olly local-LLM chat client.
//!
//! Host-independent pieces: the NDJSON response decoder, the response
//! accumulator, the partial markdown renderer, the persisted conversation
//! store and the request orchestrator that ties them together.

pub mod chat;
pub mod settings;

pub use chat::models::{
    Conversation, ConversationsStore, Message, RequestOrchestrator, RequestOutcome, RequestState,
    Role, SendRequest,
};
pub use chat::rendering::{MarkdownSpan, RenderMode, RenderedMessage, TextDirection, render};
pub use chat::services::{ChatBackend, OllamaClient, ResponseAccumulator, StreamDecoder, StreamEvent};
pub use settings::models::{Settings, SettingsStore, Theme};
