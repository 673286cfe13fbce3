use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::Message;

/// Name given to conversations created from the sidebar
pub const DEFAULT_CONVERSATION_NAME: &str = "New Chat";

/// A single persisted conversation thread
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: String,
    name: String,
    #[serde(default)]
    messages: Vec<Message>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation. The id is a time-ordered UUID, so it is
    /// both unique and derived from the creation instant.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_messages(name, Vec::new())
    }

    /// Create a conversation that already holds its first turn(s)
    pub fn with_messages(name: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.into(),
            messages,
            created_at: Utc::now(),
        }
    }

    /// Get conversation ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get conversation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the ordered message history
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }
}
