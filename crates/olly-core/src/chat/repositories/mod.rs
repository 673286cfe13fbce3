pub mod conversation_repository;
pub mod error;
pub mod in_memory_store;
pub mod json_file_store;
pub mod key_value_store;

pub use conversation_repository::ConversationRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use in_memory_store::InMemoryKeyValueStore;
pub use json_file_store::JsonFileKeyValueStore;
pub use key_value_store::{BoxFuture, CONVERSATIONS_KEY, KeyValueStore, SETTINGS_KEY, THEME_KEY};
