mod app;
mod clipboard;
mod commands;
mod markdown_view;
mod ui;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use olly_core::chat::repositories::{
    ConversationRepository, JsonFileKeyValueStore, KeyValueStore,
};
use olly_core::chat::services::DEFAULT_OLLAMA_URL;
use olly_core::settings::repositories::SettingsRepository;
use olly_core::{ConversationsStore, OllamaClient, SettingsStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;

/// Terminal chat client for a local Ollama server
#[derive(Parser, Debug)]
#[command(name = "olly", version, about)]
struct Cli {
    /// Base URL of the Ollama server
    #[arg(long, default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Directory for conversations, settings and the log file
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let kv = match cli.config_dir {
        Some(dir) => JsonFileKeyValueStore::with_dir(dir),
        None => JsonFileKeyValueStore::new()?,
    };
    let config_dir = kv.root_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    // The terminal belongs to the UI, so logs go to a file
    let log_path = config_dir.join("olly.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let backend = Arc::new(OllamaClient::new(cli.ollama_url));
    info!(config_dir = %config_dir.display(), url = %backend.base_url(), "Starting olly");

    let store: Arc<dyn KeyValueStore> = Arc::new(kv);
    let conversations = ConversationsStore::load(ConversationRepository::new(store.clone())).await;
    let settings = SettingsStore::load(SettingsRepository::new(store)).await;

    let mut app = App::new(conversations, settings, backend);
    app.spawn_model_discovery();

    let mut terminal = ratatui::try_init().context("Failed to initialize terminal")?;
    let result = app.run(&mut terminal).await;
    ratatui::try_restore().context("Failed to restore terminal")?;

    info!("Shutting down");
    result
}
