use std::sync::Arc;

use futures::StreamExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::conversations_store::ConversationsStore;
use super::message::{Message, Role};
use crate::chat::services::{
    ChatBackend, ChatRequest, LlmError, ResponseAccumulator, conversation_name, decode_stream,
};
use crate::settings::models::Settings;

/// Committed as the assistant's turn when a request fails
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I encountered an error. Please make sure Ollama is running and try again.";

/// Lifecycle of the single in-flight request
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Sending,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl RequestState {
    pub fn label(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Sending => "sending",
            RequestState::Streaming => "streaming",
            RequestState::Completed => "completed",
            RequestState::Cancelled => "cancelled",
            RequestState::Failed => "failed",
        }
    }
}

/// What the user asked for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendRequest {
    /// Append a new user message to the active conversation
    New { content: String },
    /// Replace the user message at `index` and drop everything after it
    Edit { index: usize, content: String },
    /// Resend the most recent user message, dropping the replies after it
    Regenerate,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("A request is already in flight")]
    Busy,

    #[error("No active conversation")]
    NoActiveConversation,

    #[error("Message {index} is not a user message")]
    InvalidEditTarget { index: usize },
}

/// How a streaming run ended, before anything is committed
#[derive(Debug)]
pub enum StreamOutcome {
    Completed(String),
    Cancelled,
    Failed(LlmError),
}

/// Terminal result of one request, after commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Completed,
    Cancelled,
    Failed { error: String },
}

/// A request whose user turn has been committed and which is ready to stream
#[derive(Debug)]
pub struct PendingRequest {
    conversation_id: String,
    /// Conversation contents the response will be appended to
    base_messages: Vec<Message>,
    /// Message list before the user turn was committed; `None` when the
    /// conversation was created by this request
    previous_messages: Option<Vec<Message>>,
    chat_request: ChatRequest,
    cancel: CancellationToken,
}

impl PendingRequest {
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }
}

/// Cancels whatever request is currently in flight. Cheap to clone and safe
/// to use from another task while the orchestrator is streaming.
#[derive(Clone, Default)]
pub struct RequestCanceller {
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl RequestCanceller {
    /// Returns false when nothing was in flight
    pub fn cancel(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock() = Some(token.clone());
        token
    }

    fn disarm(&self) {
        *self.current.lock() = None;
    }
}

/// Drives one request at a time through
/// `Idle -> Sending -> Streaming -> (Completed | Cancelled | Failed) -> Idle`.
///
/// A request runs in three phases so a host can move the network part onto
/// its own task:
/// 1. [`prepare`](Self::prepare) commits the user turn and builds the outbound request
/// 2. [`stream`](Self::stream) returns a `'static` future that consumes the response
/// 3. [`finish`](Self::finish) commits the result (or, on cancel, restores the
///    conversation as it was before `prepare`) and returns to `Idle`
///
/// [`send`](Self::send) runs all three in place.
pub struct RequestOrchestrator {
    backend: Arc<dyn ChatBackend>,
    state: Arc<Mutex<RequestState>>,
    canceller: RequestCanceller,
}

impl RequestOrchestrator {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(RequestState::Idle)),
            canceller: RequestCanceller::default(),
        }
    }

    pub fn backend(&self) -> Arc<dyn ChatBackend> {
        self.backend.clone()
    }

    pub fn state(&self) -> RequestState {
        *self.state.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == RequestState::Idle
    }

    pub fn canceller(&self) -> RequestCanceller {
        self.canceller.clone()
    }

    /// Signal the in-flight request to abort
    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }

    /// Commit the user turn and build the outbound request.
    ///
    /// Returns `Ok(None)` for requests that have nothing to send (blank input,
    /// regenerate without any user message). The conversation's message list
    /// is replaced in one step, so an edit's truncation and the new content
    /// land together.
    pub async fn prepare(
        &mut self,
        store: &mut ConversationsStore,
        settings: &Settings,
        request: SendRequest,
    ) -> Result<Option<PendingRequest>, OrchestratorError> {
        if !self.is_idle() {
            return Err(OrchestratorError::Busy);
        }

        let (conversation_id, base_messages, previous_messages) = match request {
            SendRequest::New { content } => {
                if content.trim().is_empty() {
                    return Ok(None);
                }
                let message = Message::user(content);

                match store.active() {
                    Some(active) => {
                        let previous = active.messages().to_vec();
                        let mut messages = previous.clone();
                        messages.push(message);
                        let id = active.id().to_string();
                        store.append_turn(&id, messages.clone()).await;
                        (id, messages, Some(previous))
                    }
                    None => {
                        let name = conversation_name(&message.content);
                        let created = store.create_with_messages(name, vec![message]).await;
                        (created.id().to_string(), created.messages().to_vec(), None)
                    }
                }
            }
            SendRequest::Edit { index, content } => {
                if content.trim().is_empty() {
                    return Ok(None);
                }
                let active = store.active().ok_or(OrchestratorError::NoActiveConversation)?;
                match active.messages().get(index) {
                    Some(m) if m.role == Role::User => {}
                    _ => return Err(OrchestratorError::InvalidEditTarget { index }),
                }

                let previous = active.messages().to_vec();
                let mut messages = previous[..index].to_vec();
                messages.push(Message::user(content));
                let id = active.id().to_string();
                debug!(conv_id = %id, index, "Editing message and truncating");
                store.append_turn(&id, messages.clone()).await;
                (id, messages, Some(previous))
            }
            SendRequest::Regenerate => {
                let active = store.active().ok_or(OrchestratorError::NoActiveConversation)?;
                let Some(index) = active.messages().iter().rposition(|m| m.role == Role::User)
                else {
                    return Ok(None);
                };

                let previous = active.messages().to_vec();
                let messages = previous[..=index].to_vec();
                let id = active.id().to_string();
                debug!(conv_id = %id, index, "Regenerating last response");
                store.append_turn(&id, messages.clone()).await;
                (id, messages, Some(previous))
            }
        };

        let chat_request = ChatRequest::build(settings, &base_messages);
        let cancel = self.canceller.arm();
        self.set_state(RequestState::Sending);
        debug!(
            conv_id = %conversation_id,
            model = %chat_request.model,
            outbound = chat_request.messages.len(),
            "Request prepared"
        );

        Ok(Some(PendingRequest {
            conversation_id,
            base_messages,
            previous_messages,
            chat_request,
            cancel,
        }))
    }

    /// Future that consumes the response for `pending`.
    ///
    /// Every text fragment republishes the full accumulated buffer on `live`.
    /// The future does not touch the conversation store.
    pub fn stream(
        &self,
        pending: &PendingRequest,
        live: watch::Sender<String>,
    ) -> BoxFuture<'static, StreamOutcome> {
        let backend = self.backend.clone();
        let state = self.state.clone();
        let request = pending.chat_request.clone();
        let cancel = pending.cancel.clone();

        Box::pin(async move {
            let outcome = drive_stream(backend, request, cancel, &state, &live).await;
            let terminal = match &outcome {
                StreamOutcome::Completed(_) => RequestState::Completed,
                StreamOutcome::Cancelled => RequestState::Cancelled,
                StreamOutcome::Failed(_) => RequestState::Failed,
            };
            *state.lock() = terminal;
            outcome
        })
    }

    /// Commit the outcome of a streaming run and return to `Idle`
    pub async fn finish(
        &mut self,
        store: &mut ConversationsStore,
        pending: PendingRequest,
        outcome: StreamOutcome,
    ) -> RequestOutcome {
        let PendingRequest {
            conversation_id,
            mut base_messages,
            previous_messages,
            ..
        } = pending;

        let result = match outcome {
            StreamOutcome::Completed(text) => {
                debug!(conv_id = %conversation_id, chars = text.len(), "Response completed");
                base_messages.push(Message::assistant(text));
                store.append_turn(&conversation_id, base_messages).await;
                RequestOutcome::Completed
            }
            StreamOutcome::Cancelled => {
                info!(conv_id = %conversation_id, "Request cancelled, response discarded");
                // Undo the user turn, including any edit or regenerate truncation
                match previous_messages {
                    Some(messages) => {
                        store.append_turn(&conversation_id, messages).await;
                    }
                    None => {
                        store.delete(&conversation_id).await;
                    }
                }
                RequestOutcome::Cancelled
            }
            StreamOutcome::Failed(e) => {
                error!(conv_id = %conversation_id, error = %e, "Chat request failed");
                base_messages.push(Message::assistant(APOLOGY_MESSAGE));
                store.append_turn(&conversation_id, base_messages).await;
                RequestOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        self.canceller.disarm();
        self.set_state(RequestState::Idle);
        result
    }

    /// Prepare, stream and finish in place
    pub async fn send(
        &mut self,
        store: &mut ConversationsStore,
        settings: &Settings,
        request: SendRequest,
        live: watch::Sender<String>,
    ) -> Result<Option<RequestOutcome>, OrchestratorError> {
        let Some(pending) = self.prepare(store, settings, request).await? else {
            return Ok(None);
        };
        let outcome = self.stream(&pending, live).await;
        Ok(Some(self.finish(store, pending, outcome).await))
    }

    fn set_state(&self, next: RequestState) {
        let mut state = self.state.lock();
        debug!(from = state.label(), to = next.label(), "Request state");
        *state = next;
    }
}

async fn drive_stream(
    backend: Arc<dyn ChatBackend>,
    request: ChatRequest,
    cancel: CancellationToken,
    state: &Mutex<RequestState>,
    live: &watch::Sender<String>,
) -> StreamOutcome {
    live.send_replace(String::new());

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return StreamOutcome::Cancelled,
        opened = backend.open_chat(request) => opened,
    };
    let body = match opened {
        Ok(body) => body,
        Err(e) => return StreamOutcome::Failed(e),
    };
    *state.lock() = RequestState::Streaming;

    let events = decode_stream(body);
    futures::pin_mut!(events);
    let mut accumulator = ResponseAccumulator::new();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                accumulator.discard();
                return StreamOutcome::Cancelled;
            }
            next = events.next() => next,
        };

        match next {
            Some(Ok(event)) => {
                if let Some(buffer) = accumulator.apply(&event) {
                    live.send_replace(buffer.to_string());
                }
            }
            Some(Err(e)) => return StreamOutcome::Failed(e),
            None => break,
        }
    }

    StreamOutcome::Completed(accumulator.finish())
}
