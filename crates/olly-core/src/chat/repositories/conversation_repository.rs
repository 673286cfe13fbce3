use std::sync::Arc;

use tracing::warn;

use super::error::RepositoryResult;
use super::key_value_store::{CONVERSATIONS_KEY, KeyValueStore};
use crate::chat::models::Conversation;

/// Persists the whole ordered conversation list as one snapshot under
/// [`CONVERSATIONS_KEY`].
#[derive(Clone)]
pub struct ConversationRepository {
    store: Arc<dyn KeyValueStore>,
}

impl ConversationRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the persisted list. Absent or malformed snapshots yield an empty
    /// list; only storage failures are errors.
    pub async fn load_all(&self) -> RepositoryResult<Vec<Conversation>> {
        let Some(raw) = self.store.get(CONVERSATIONS_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Conversation>>(&raw) {
            Ok(conversations) => Ok(conversations),
            Err(e) => {
                warn!(error = ?e, "Stored conversation list is malformed, starting empty");
                Ok(Vec::new())
            }
        }
    }

    /// Replace the persisted snapshot with `conversations`
    pub async fn save_all(&self, conversations: &[Conversation]) -> RepositoryResult<()> {
        let json = serde_json::to_string(conversations)?;
        self.store.set(CONVERSATIONS_KEY, json).await
    }

    /// Drop the persisted snapshot entirely
    pub async fn clear(&self) -> RepositoryResult<()> {
        self.store.remove(CONVERSATIONS_KEY).await
    }
}
