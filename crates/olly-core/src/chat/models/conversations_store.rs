use tracing::{debug, warn};

use super::conversation::{Conversation, DEFAULT_CONVERSATION_NAME};
use super::message::Message;
use crate::chat::repositories::ConversationRepository;

/// Ordered, persisted collection of conversations plus the active selection.
///
/// The store is the single writer of the conversation list. Every mutating
/// command updates the in-memory list in one step and then writes the whole
/// snapshot through the repository. Persistence is best-effort: a failed
/// write is logged and the in-memory state is kept.
pub struct ConversationsStore {
    conversations: Vec<Conversation>,
    active_conversation_id: Option<String>,
    repository: ConversationRepository,
}

impl ConversationsStore {
    /// Create an empty store backed by `repository`
    pub fn new(repository: ConversationRepository) -> Self {
        Self {
            conversations: Vec::new(),
            active_conversation_id: None,
            repository,
        }
    }

    /// Restore the persisted list; the first conversation becomes active
    pub async fn load(repository: ConversationRepository) -> Self {
        let conversations = match repository.load_all().await {
            Ok(conversations) => conversations,
            Err(e) => {
                warn!(error = ?e, "Failed to load conversations, starting empty");
                Vec::new()
            }
        };
        debug!(count = conversations.len(), "Loaded conversations");

        let active_conversation_id = conversations.first().map(|c| c.id().to_string());
        Self {
            conversations,
            active_conversation_id,
            repository,
        }
    }

    /// All conversations, newest first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    /// Get a conversation by ID
    pub fn get(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    /// Get the active conversation ID
    pub fn active_id(&self) -> Option<&str> {
        self.active_conversation_id.as_deref()
    }

    /// Get the active conversation
    pub fn active(&self) -> Option<&Conversation> {
        self.active_id().and_then(|id| self.get(id))
    }

    /// Get count of conversations
    pub fn count(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Conversations whose name contains `query`, case-insensitively, in store order
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        let needle = query.to_lowercase();
        self.conversations
            .iter()
            .filter(|c| c.name().to_lowercase().contains(&needle))
            .collect()
    }

    /// Create an empty "New Chat" conversation at the front and select it
    pub async fn create(&mut self) -> Conversation {
        self.insert_front(Conversation::new(DEFAULT_CONVERSATION_NAME))
            .await
    }

    /// Create a conversation that already holds `messages`, at the front, and select it
    pub async fn create_with_messages(
        &mut self,
        name: impl Into<String>,
        messages: Vec<Message>,
    ) -> Conversation {
        self.insert_front(Conversation::with_messages(name, messages))
            .await
    }

    async fn insert_front(&mut self, conversation: Conversation) -> Conversation {
        debug!(conv_id = %conversation.id(), "Creating conversation");
        self.active_conversation_id = Some(conversation.id().to_string());
        self.conversations.insert(0, conversation.clone());
        self.persist().await;
        conversation
    }

    /// Set the active conversation. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: &str) -> bool {
        if self.get(id).is_some() {
            self.active_conversation_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Rename a conversation. Names that trim to empty are ignored.
    pub async fn rename(&mut self, id: &str, new_name: &str) -> bool {
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return false;
        }

        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id() == id) else {
            return false;
        };
        conversation.set_name(trimmed.to_string());
        self.persist().await;
        true
    }

    /// Delete a conversation. If it was active, the new first conversation
    /// becomes active (or none when the list is empty).
    pub async fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.conversations.iter().position(|c| c.id() == id) else {
            return false;
        };
        self.conversations.remove(index);

        if self.active_conversation_id.as_deref() == Some(id) {
            self.active_conversation_id = self.conversations.first().map(|c| c.id().to_string());
        }

        debug!(conv_id = %id, "Deleted conversation");
        self.persist().await;
        true
    }

    /// Replace a conversation's full message list. Used for appends as well as
    /// for edit-triggered truncation, so the caller always supplies the final list.
    pub async fn append_turn(&mut self, id: &str, messages: Vec<Message>) -> bool {
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id() == id) else {
            warn!(conv_id = %id, "append_turn on unknown conversation");
            return false;
        };
        conversation.replace_messages(messages);
        self.persist().await;
        true
    }

    /// Remove every conversation and clear the selection
    pub async fn clear_all(&mut self) {
        self.conversations.clear();
        self.active_conversation_id = None;

        if let Err(e) = self.repository.clear().await {
            warn!(error = ?e, "Failed to clear persisted conversations");
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.repository.save_all(&self.conversations).await {
            warn!(error = ?e, "Failed to persist conversations");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::chat::repositories::InMemoryKeyValueStore;

    fn store_with_kv() -> (ConversationsStore, InMemoryKeyValueStore) {
        let kv = InMemoryKeyValueStore::new();
        let repo = ConversationRepository::new(Arc::new(kv.clone()));
        (ConversationsStore::new(repo), kv)
    }

    async fn persisted(kv: &InMemoryKeyValueStore) -> Vec<Conversation> {
        ConversationRepository::new(Arc::new(kv.clone()))
            .load_all()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_inserts_at_front_and_selects() {
        let (mut store, kv) = store_with_kv();

        let first = store.create().await;
        let second = store.create().await;

        assert_eq!(store.conversations()[0].id(), second.id());
        assert_eq!(store.conversations()[1].id(), first.id());
        assert_eq!(store.active_id(), Some(second.id()));
        assert_eq!(second.name(), "New Chat");
        assert!(second.messages().is_empty());
        assert_eq!(persisted(&kv).await.len(), 2);
    }

    #[tokio::test]
    async fn test_rename_whitespace_is_noop() {
        let (mut store, kv) = store_with_kv();
        let conv = store.create().await;

        assert!(!store.rename(conv.id(), "   ").await);
        assert_eq!(store.get(conv.id()).unwrap().name(), "New Chat");

        assert!(store.rename(conv.id(), "Trip Planning").await);
        assert_eq!(store.get(conv.id()).unwrap().name(), "Trip Planning");
        assert_eq!(persisted(&kv).await[0].name(), "Trip Planning");
    }

    #[tokio::test]
    async fn test_rename_trims() {
        let (mut store, _kv) = store_with_kv();
        let conv = store.create().await;

        store.rename(conv.id(), "  Padded  ").await;
        assert_eq!(store.get(conv.id()).unwrap().name(), "Padded");
    }

    #[tokio::test]
    async fn test_delete_only_conversation_clears_selection() {
        let (mut store, kv) = store_with_kv();
        let conv = store.create().await;

        assert!(store.delete(conv.id()).await);
        assert_eq!(store.active_id(), None);
        assert!(store.is_empty());
        assert!(persisted(&kv).await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_non_selected_keeps_selection() {
        let (mut store, _kv) = store_with_kv();
        let older = store.create().await;
        let newer = store.create().await;

        assert!(store.delete(older.id()).await);
        assert_eq!(store.active_id(), Some(newer.id()));
    }

    #[tokio::test]
    async fn test_delete_selected_falls_to_first_remaining() {
        let (mut store, _kv) = store_with_kv();
        let a = store.create().await;
        let b = store.create().await;
        let c = store.create().await;

        store.select(b.id());
        store.delete(b.id()).await;

        // Remaining order is [c, a]; the first element takes over
        assert_eq!(store.active_id(), Some(c.id()));
        assert!(store.get(a.id()).is_some());
    }

    #[tokio::test]
    async fn test_select_unknown_is_rejected() {
        let (mut store, _kv) = store_with_kv();
        let conv = store.create().await;

        assert!(!store.select("missing"));
        assert_eq!(store.active_id(), Some(conv.id()));
    }

    #[tokio::test]
    async fn test_append_turn_replaces_list() {
        let (mut store, kv) = store_with_kv();
        let conv = store.create().await;

        store
            .append_turn(
                conv.id(),
                vec![Message::user("q"), Message::assistant("a")],
            )
            .await;
        store
            .append_turn(conv.id(), vec![Message::user("edited")])
            .await;

        assert_eq!(
            store.get(conv.id()).unwrap().messages(),
            &[Message::user("edited")]
        );
        assert_eq!(persisted(&kv).await[0].messages().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (mut store, kv) = store_with_kv();
        store.create().await;
        store.create().await;

        store.clear_all().await;

        assert!(store.is_empty());
        assert_eq!(store.active_id(), None);
        assert_eq!(kv.raw(crate::chat::repositories::CONVERSATIONS_KEY), None);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let (mut store, _kv) = store_with_kv();
        let trip = store.create().await;
        store.rename(trip.id(), "Trip Planning").await;
        store.create().await;

        let hits = store.search("trip");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id(), trip.id());
        assert_eq!(store.search("").len(), 2);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_state() {
        let (mut store, kv) = store_with_kv();
        let conv = store.create().await;

        kv.set_fail_writes(true);
        assert!(store.rename(conv.id(), "Renamed").await);

        assert_eq!(store.get(conv.id()).unwrap().name(), "Renamed");
        assert_eq!(persisted(&kv).await[0].name(), "New Chat");
    }

    #[tokio::test]
    async fn test_load_selects_first() {
        let (mut store, kv) = store_with_kv();
        store.create().await;
        let newest = store.create().await;

        let reloaded =
            ConversationsStore::load(ConversationRepository::new(Arc::new(kv.clone()))).await;
        assert_eq!(reloaded.count(), 2);
        assert_eq!(reloaded.active_id(), Some(newest.id()));
    }
}
