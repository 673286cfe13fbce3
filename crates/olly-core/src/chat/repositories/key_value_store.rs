use std::future::Future;
use std::pin::Pin;

use super::error::RepositoryResult;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Key holding the serialized, ordered conversation list
pub const CONVERSATIONS_KEY: &str = "ollama-conversations";

/// Key holding the serialized settings object
pub const SETTINGS_KEY: &str = "ollama-settings";

/// Key holding the theme preference (`"dark"` or `"light"`)
pub const THEME_KEY: &str = "ollama-theme";

/// Durable local key-value storage.
///
/// Values are opaque text; callers own the serialization format. A missing
/// key is `Ok(None)`, never an error.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> BoxFuture<'static, RepositoryResult<Option<String>>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: String) -> BoxFuture<'static, RepositoryResult<()>>;

    /// Remove `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> BoxFuture<'static, RepositoryResult<()>>;
}
