use std::sync::Arc;

use tracing::warn;

use crate::chat::repositories::{KeyValueStore, RepositoryResult, SETTINGS_KEY, THEME_KEY};
use crate::settings::models::{Settings, Theme};

/// Settings and theme preference over the shared key-value store.
///
/// Absent or malformed values load as defaults; only storage failures are
/// errors.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load_settings(&self) -> RepositoryResult<Settings> {
        let Some(raw) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(Settings::default());
        };

        Ok(Settings::merge_json(&raw).unwrap_or_else(|| {
            warn!("Stored settings are malformed, using defaults");
            Settings::default()
        }))
    }

    pub async fn save_settings(&self, settings: &Settings) -> RepositoryResult<()> {
        let json = serde_json::to_string_pretty(settings)?;
        self.store.set(SETTINGS_KEY, json).await
    }

    pub async fn load_theme(&self) -> RepositoryResult<Theme> {
        let Some(raw) = self.store.get(THEME_KEY).await? else {
            return Ok(Theme::default());
        };

        Ok(raw.parse().unwrap_or_else(|e: String| {
            warn!(error = %e, "Stored theme is malformed, using default");
            Theme::default()
        }))
    }

    /// Stored as a JSON string so the file stays valid JSON
    pub async fn save_theme(&self, theme: Theme) -> RepositoryResult<()> {
        let json = serde_json::to_string(&theme)?;
        self.store.set(THEME_KEY, json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::repositories::InMemoryKeyValueStore;

    fn repo() -> (SettingsRepository, InMemoryKeyValueStore) {
        let kv = InMemoryKeyValueStore::new();
        (SettingsRepository::new(Arc::new(kv.clone())), kv)
    }

    #[tokio::test]
    async fn test_absent_values_are_defaults() {
        let (repo, _kv) = repo();
        assert_eq!(repo.load_settings().await.unwrap(), Settings::default());
        assert_eq!(repo.load_theme().await.unwrap(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let (repo, _kv) = repo();
        let settings = Settings {
            model: "mistral:7b".to_string(),
            temperature: 0.7,
            ..Settings::default()
        };

        repo.save_settings(&settings).await.unwrap();
        assert_eq!(repo.load_settings().await.unwrap(), settings);
    }

    #[tokio::test]
    async fn test_malformed_settings_fall_back() {
        let (repo, kv) = repo();
        kv.set(SETTINGS_KEY, "{oops".to_string()).await.unwrap();

        assert_eq!(repo.load_settings().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_theme_stored_as_text() {
        let (repo, kv) = repo();
        repo.save_theme(Theme::Light).await.unwrap();

        assert_eq!(kv.raw(THEME_KEY).as_deref(), Some("\"light\""));
        assert_eq!(repo.load_theme().await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn test_bare_theme_text_is_accepted() {
        let (repo, kv) = repo();
        kv.set(THEME_KEY, "light".to_string()).await.unwrap();
        assert_eq!(repo.load_theme().await.unwrap(), Theme::Light);

        kv.set(THEME_KEY, "purple".to_string()).await.unwrap();
        assert_eq!(repo.load_theme().await.unwrap(), Theme::Dark);
    }
}
