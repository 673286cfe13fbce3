use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::chat::services::ChatBackend;
use crate::settings::models::SettingsStore;

/// Discover the models the server can run
///
/// # Errors
/// Returns an error if:
/// - The HTTP request fails
/// - The API returns a non-success status
/// - The response cannot be deserialized
pub async fn discover_models(backend: &dyn ChatBackend) -> Result<Vec<String>> {
    let models = backend
        .list_models()
        .await
        .context("Failed to list Ollama models")?;
    debug!(count = models.len(), "Discovered Ollama models");
    Ok(models)
}

/// What model discovery did to the saved model
#[derive(Debug, PartialEq, Eq)]
pub enum ModelResolution {
    /// The saved model is available, or the server offers none
    Kept(Vec<String>),
    /// The saved model was missing and the first available one took over
    Switched(Vec<String>),
    /// The listing failed; the saved model stays
    Unreachable,
}

impl ModelResolution {
    /// Models the server offers; empty when it could not be reached
    pub fn models(&self) -> &[String] {
        match self {
            ModelResolution::Kept(models) | ModelResolution::Switched(models) => models,
            ModelResolution::Unreachable => &[],
        }
    }
}

/// Reconcile the saved model with a [`discover_models`] result and persist
/// the outcome.
pub async fn resolve_saved_model(
    discovered: Result<Vec<String>>,
    settings: &mut SettingsStore,
) -> ModelResolution {
    match discovered {
        Ok(models) => {
            if settings.apply_available_models(&models).await {
                ModelResolution::Switched(models)
            } else {
                ModelResolution::Kept(models)
            }
        }
        Err(e) => {
            warn!(error = ?e, model = %settings.settings().model, "Model discovery failed, keeping saved model");
            ModelResolution::Unreachable
        }
    }
}
