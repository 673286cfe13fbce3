use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

use crate::chat::models::Message;
use crate::settings::models::Settings;

/// Failures talking to the model server. Per-line decode problems never
/// show up here; the stream decoder drops those.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned status {status}")]
    Status { status: u16 },

    #[error("Response stream failed: {message}")]
    Stream { message: String },
}

/// Raw response body, chunked however the transport delivers it
pub type ByteStream = BoxStream<'static, Result<Bytes, LlmError>>;

/// Sampling options forwarded to the server
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
    pub num_predict: u32,
}

/// Body of a streaming chat request
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    pub options: ChatOptions,
}

impl ChatRequest {
    /// System prompt followed by the trailing `history_length` messages of
    /// `history`. Stored history is never modified, only sliced.
    pub fn build(settings: &Settings, history: &[Message]) -> Self {
        let start = history.len().saturating_sub(settings.history_length);

        let mut messages = Vec::with_capacity(history.len() - start + 1);
        messages.push(Message::system(settings.system_prompt.clone()));
        messages.extend_from_slice(&history[start..]);

        Self {
            model: settings.model.clone(),
            messages,
            stream: true,
            options: ChatOptions {
                temperature: settings.temperature,
                num_predict: settings.max_tokens,
            },
        }
    }
}

/// The model server as seen by the orchestrator
pub trait ChatBackend: Send + Sync + 'static {
    /// Identifiers of the models the server can run
    fn list_models(&self) -> BoxFuture<'static, Result<Vec<String>, LlmError>>;

    /// Dispatch a chat request. Resolves once the server has answered with a
    /// success status; the body is then consumed from the returned stream.
    fn open_chat(&self, request: ChatRequest) -> BoxFuture<'static, Result<ByteStream, LlmError>>;
}
