pub mod conversation;
pub mod conversations_store;
pub mod message;
pub mod orchestrator;

pub use conversation::{Conversation, DEFAULT_CONVERSATION_NAME};
pub use conversations_store::ConversationsStore;
pub use message::{Message, Role};
pub use orchestrator::{
    APOLOGY_MESSAGE, OrchestratorError, PendingRequest, RequestCanceller, RequestOrchestrator,
    RequestOutcome, RequestState, SendRequest, StreamOutcome,
};
