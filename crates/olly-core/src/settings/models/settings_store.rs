use tracing::{debug, info, warn};

use super::settings::Settings;
use super::theme::Theme;
use crate::settings::repositories::SettingsRepository;

/// Current settings and theme, written through to storage on every change
pub struct SettingsStore {
    settings: Settings,
    theme: Theme,
    repository: SettingsRepository,
}

impl SettingsStore {
    pub fn new(repository: SettingsRepository) -> Self {
        Self {
            settings: Settings::default(),
            theme: Theme::default(),
            repository,
        }
    }

    /// Restore persisted settings and theme, falling back to defaults
    pub async fn load(repository: SettingsRepository) -> Self {
        let settings = repository.load_settings().await.unwrap_or_else(|e| {
            warn!(error = ?e, "Failed to load settings, using defaults");
            Settings::default()
        });
        let theme = repository.load_theme().await.unwrap_or_else(|e| {
            warn!(error = ?e, "Failed to load theme, using default");
            Theme::default()
        });
        debug!(model = %settings.model, theme = %theme, "Loaded settings");

        Self {
            settings,
            theme,
            repository,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Apply `change`, sanitize the result and persist it
    pub async fn update(&mut self, change: impl FnOnce(&mut Settings)) {
        let mut next = self.settings.clone();
        change(&mut next);
        self.settings = next.sanitize();
        self.persist().await;
    }

    pub async fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        self.update(|s| s.model = model).await;
    }

    pub async fn set_temperature(&mut self, temperature: f32) {
        self.update(|s| s.temperature = temperature).await;
    }

    pub async fn set_max_tokens(&mut self, max_tokens: u32) {
        self.update(|s| s.max_tokens = max_tokens).await;
    }

    pub async fn set_history_length(&mut self, history_length: usize) {
        self.update(|s| s.history_length = history_length).await;
    }

    pub async fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        let prompt = prompt.into();
        self.update(|s| s.system_prompt = prompt).await;
    }

    /// Pick the model to use given what the server offers.
    ///
    /// The saved model stays when it is available or when the list is empty;
    /// otherwise the first available model takes over. Returns true when the
    /// model changed.
    pub async fn apply_available_models(&mut self, available: &[String]) -> bool {
        let Some(first) = available.first() else {
            return false;
        };
        if available.contains(&self.settings.model) {
            self.persist().await;
            return false;
        }

        info!(from = %self.settings.model, to = %first, "Saved model not available, switching");
        self.set_model(first.clone()).await;
        true
    }

    pub async fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(e) = self.repository.save_theme(theme).await {
            warn!(error = ?e, "Failed to persist theme");
        }
    }

    pub async fn toggle_theme(&mut self) -> Theme {
        self.set_theme(self.theme.toggled()).await;
        self.theme
    }

    async fn persist(&self) {
        if let Err(e) = self.repository.save_settings(&self.settings).await {
            warn!(error = ?e, "Failed to persist settings");
        }
    }
}
