use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use olly_core::chat::exporters::write_markdown;
use olly_core::chat::models::{PendingRequest, StreamOutcome};
use olly_core::chat::services::extract_attachment;
use olly_core::settings::providers::ollama::{ModelResolution, discover_models, resolve_saved_model};
use olly_core::{
    ChatBackend, Conversation, ConversationsStore, Message, RequestOrchestrator, RequestOutcome,
    SendRequest, SettingsStore,
};
use ratatui::DefaultTerminal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::clipboard::{self, SystemClipboard};
use crate::commands::{Command, EXAMPLE_PROMPTS, HELP};
use crate::ui;

/// Results of background work, delivered back to the UI loop
pub enum AppEvent {
    ModelsDiscovered(Result<Vec<String>>),
    StreamFinished(StreamOutcome),
}

pub struct App {
    conversations: ConversationsStore,
    settings: SettingsStore,
    orchestrator: RequestOrchestrator,
    models: Vec<String>,
    input: String,
    search: String,
    notice: Option<String>,
    scroll_back: u16,
    pending: Option<PendingRequest>,
    live_rx: Option<watch::Receiver<String>>,
    clipboard: SystemClipboard,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    running: bool,
}

impl App {
    pub fn new(
        conversations: ConversationsStore,
        settings: SettingsStore,
        backend: Arc<dyn ChatBackend>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            conversations,
            settings,
            orchestrator: RequestOrchestrator::new(backend),
            models: Vec::new(),
            input: String::new(),
            search: String::new(),
            notice: None,
            scroll_back: 0,
            pending: None,
            live_rx: None,
            clipboard: SystemClipboard::default(),
            events_tx,
            events_rx,
            running: true,
        }
    }

    pub fn conversations(&self) -> &ConversationsStore {
        &self.conversations
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn scroll_back(&self) -> u16 {
        self.scroll_back
    }

    pub fn is_idle(&self) -> bool {
        self.orchestrator.is_idle()
    }

    pub fn state_label(&self) -> &'static str {
        self.orchestrator.state().label()
    }

    /// Conversations shown in the sidebar
    pub fn visible_conversations(&self) -> Vec<&Conversation> {
        self.conversations.search(&self.search)
    }

    /// Partial response for the active conversation, while one is streaming
    pub fn live_response(&self) -> Option<String> {
        let pending = self.pending.as_ref()?;
        if self.conversations.active_id() != Some(pending.conversation_id()) {
            return None;
        }
        self.live_rx.as_ref().map(|rx| rx.borrow().clone())
    }

    /// Ask the server for its models without blocking the UI
    pub fn spawn_model_discovery(&self) {
        let backend = self.orchestrator.backend();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = discover_models(backend.as_ref()).await;
            let _ = tx.send(AppEvent::ModelsDiscovered(result));
        });
    }

    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let mut terminal_events = EventStream::new();

        while self.running {
            terminal.draw(|frame| ui::draw(frame, self))?;

            tokio::select! {
                maybe_event = terminal_events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                _ = live_update(&mut self.live_rx) => {}
            }
        }

        if self.orchestrator.cancel() {
            info!("Cancelled in-flight request on exit");
        }
        Ok(())
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('c') if ctrl => self.running = false,
            KeyCode::Char('n') if ctrl => {
                self.conversations.create().await;
                self.scroll_back = 0;
            }
            KeyCode::Char('t') if ctrl => self.toggle_theme().await,
            KeyCode::Up if ctrl => self.move_selection(-1),
            KeyCode::Down if ctrl => self.move_selection(1),
            KeyCode::PageUp => self.scroll_back = self.scroll_back.saturating_add(10),
            KeyCode::PageDown => self.scroll_back = self.scroll_back.saturating_sub(10),
            KeyCode::Esc => {
                if self.orchestrator.cancel() {
                    self.notice = Some("Cancelling...".to_string());
                }
            }
            KeyCode::Enter => self.submit().await,
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.input.push(c),
            _ => {}
        }
    }

    async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ModelsDiscovered(discovered) => {
                let resolution = resolve_saved_model(discovered, &mut self.settings).await;
                match &resolution {
                    ModelResolution::Switched(_) => {
                        self.notice =
                            Some(format!("Using model {}", self.settings.settings().model));
                    }
                    ModelResolution::Kept(_) => {}
                    ModelResolution::Unreachable => {
                        self.notice =
                            Some("Could not reach Ollama; keeping saved model".to_string());
                    }
                }
                debug!(count = resolution.models().len(), "Models available");
                self.models = resolution.models().to_vec();
            }
            AppEvent::StreamFinished(outcome) => {
                let Some(pending) = self.pending.take() else {
                    return;
                };
                let result = self
                    .orchestrator
                    .finish(&mut self.conversations, pending, outcome)
                    .await;
                self.live_rx = None;
                self.notice = match result {
                    RequestOutcome::Completed => None,
                    RequestOutcome::Cancelled => Some("Response cancelled".to_string()),
                    RequestOutcome::Failed { error } => Some(format!("Request failed: {}", error)),
                };
            }
        }
    }

    async fn submit(&mut self) {
        let line = self.input.trim().to_string();
        if line.is_empty() {
            return;
        }

        if line.starts_with('/') {
            self.input.clear();
            match Command::parse(&line) {
                Ok(command) => self.execute(command).await,
                Err(notice) => self.notice = Some(notice),
            }
            return;
        }

        if !self.is_idle() {
            self.notice = Some("Wait for the current response or press Esc".to_string());
            return;
        }

        self.input.clear();
        self.send(SendRequest::New { content: line }).await;
    }

    async fn send(&mut self, request: SendRequest) {
        if !self.is_idle() {
            self.notice = Some("A response is still streaming".to_string());
            return;
        }

        let settings = self.settings.settings().clone();
        let pending = match self
            .orchestrator
            .prepare(&mut self.conversations, &settings, request)
            .await
        {
            Ok(Some(pending)) => pending,
            Ok(None) => return,
            Err(e) => {
                self.notice = Some(e.to_string());
                return;
            }
        };

        let (live_tx, live_rx) = watch::channel(String::new());
        let stream = self.orchestrator.stream(&pending, live_tx);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = stream.await;
            let _ = tx.send(AppEvent::StreamFinished(outcome));
        });

        self.pending = Some(pending);
        self.live_rx = Some(live_rx);
        self.scroll_back = 0;
        self.notice = None;
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::New => {
                self.conversations.create().await;
            }
            Command::Rename(name) => match self.active_id() {
                Some(id) => {
                    self.conversations.rename(&id, &name).await;
                }
                None => self.notice = Some("No conversation selected".to_string()),
            },
            Command::Delete => {
                if let Some(id) = self.active_id() {
                    if self.pending.as_ref().map(|p| p.conversation_id()) == Some(id.as_str()) {
                        self.notice = Some("Cancel the response before deleting".to_string());
                        return;
                    }
                    self.conversations.delete(&id).await;
                }
            }
            Command::Clear => {
                if !self.is_idle() {
                    self.notice = Some("Cancel the response before clearing".to_string());
                    return;
                }
                self.conversations.clear_all().await;
                self.notice = Some("All conversations deleted".to_string());
            }
            Command::Export(target) => self.export(target).await,
            Command::Search(query) => self.search = query,
            Command::Models => {
                self.notice = Some(if self.models.is_empty() {
                    "No models discovered".to_string()
                } else {
                    self.models.join(", ")
                });
            }
            Command::Model(name) => {
                if !self.models.is_empty() && !self.models.contains(&name) {
                    self.notice = Some(format!("Unknown model {}", name));
                    return;
                }
                self.settings.set_model(name).await;
            }
            Command::Temperature(t) => self.settings.set_temperature(t).await,
            Command::MaxTokens(n) => self.settings.set_max_tokens(n).await,
            Command::History(n) => self.settings.set_history_length(n).await,
            Command::System(prompt) => self.settings.set_system_prompt(prompt).await,
            Command::Edit { number, content } => {
                self.send(SendRequest::Edit {
                    index: number - 1,
                    content,
                })
                .await
            }
            Command::Regenerate => self.send(SendRequest::Regenerate).await,
            Command::Copy(number) => {
                let selection = clipboard::message_text(self.active_messages(), number)
                    .map(str::to_string);
                self.copy(selection);
            }
            Command::CopyCode(number) => {
                let selection = clipboard::code_block(self.active_messages(), number);
                self.copy(selection);
            }
            Command::Example(number) => {
                let content = EXAMPLE_PROMPTS[number - 1].to_string();
                self.send(SendRequest::New { content }).await
            }
            Command::Attach(path) => match extract_attachment(&path).await {
                Ok(block) => {
                    self.input.push_str(&block);
                    self.notice = Some(format!("Attached {}", path.display()));
                }
                Err(e) => self.notice = Some(e.to_string()),
            },
            Command::Theme => self.toggle_theme().await,
            Command::Help => self.notice = Some(HELP.to_string()),
        }
    }

    async fn export(&mut self, target: Option<PathBuf>) {
        let Some(conversation) = self.conversations.active() else {
            self.notice = Some("No conversation selected".to_string());
            return;
        };
        let target = target.unwrap_or_else(|| PathBuf::from("."));

        self.notice = Some(match write_markdown(conversation, &target).await {
            Ok(path) => format!("Exported to {}", path.display()),
            Err(e) => format!("{:#}", e),
        });
    }

    fn copy(&mut self, selection: Result<String, String>) {
        let result = selection.and_then(|text| {
            self.clipboard
                .set_text(&text)
                .map(|()| text.chars().count())
                .map_err(|e| format!("{:#}", e))
        });
        self.notice = Some(match result {
            Ok(chars) => format!("Copied {} characters", chars),
            Err(notice) => notice,
        });
    }

    async fn toggle_theme(&mut self) {
        let theme = self.settings.toggle_theme().await;
        debug!(theme = %theme, "Theme toggled");
    }

    fn active_messages(&self) -> &[Message] {
        self.conversations
            .active()
            .map(|c| c.messages())
            .unwrap_or_default()
    }

    fn active_id(&self) -> Option<String> {
        self.conversations.active_id().map(str::to_string)
    }

    /// Move the active selection through the sidebar's visible list
    fn move_selection(&mut self, delta: isize) {
        let visible: Vec<String> = self
            .visible_conversations()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        if visible.is_empty() {
            return;
        }

        let current = self
            .conversations
            .active_id()
            .and_then(|id| visible.iter().position(|v| v == id));
        let next = match current {
            Some(i) => (i as isize + delta).clamp(0, visible.len() as isize - 1) as usize,
            None => 0,
        };
        self.conversations.select(&visible[next]);
        self.scroll_back = 0;
    }
}

/// Resolves whenever the live buffer changes; never while nothing streams
async fn live_update(rx: &mut Option<watch::Receiver<String>>) {
    if let Some(rx) = rx {
        if rx.changed().await.is_ok() {
            return;
        }
    }
    std::future::pending().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use olly_core::chat::repositories::{ConversationRepository, InMemoryKeyValueStore};
    use olly_core::chat::services::{ByteStream, ChatRequest, LlmError};
    use olly_core::settings::repositories::SettingsRepository;

    struct Offline;

    impl ChatBackend for Offline {
        fn list_models(&self) -> BoxFuture<'static, Result<Vec<String>, LlmError>> {
            Box::pin(async { Ok(vec!["llama3".to_string(), "phi3".to_string()]) })
        }

        fn open_chat(
            &self,
            _request: ChatRequest,
        ) -> BoxFuture<'static, Result<ByteStream, LlmError>> {
            Box::pin(async { Err(LlmError::Status { status: 503 }) })
        }
    }

    fn app() -> App {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        App::new(
            ConversationsStore::new(ConversationRepository::new(kv.clone())),
            SettingsStore::new(SettingsRepository::new(kv)),
            Arc::new(Offline),
        )
    }

    async fn type_line(app: &mut App, line: &str) {
        app.input = line.to_string();
        app.submit().await;
    }

    #[tokio::test]
    async fn test_slash_commands_update_settings() {
        let mut app = app();
        type_line(&mut app, "/temperature 0.4").await;
        type_line(&mut app, "/max-tokens 300").await;
        type_line(&mut app, "/system Be brief").await;

        let settings = app.settings().settings();
        assert_eq!(settings.temperature, 0.4);
        assert_eq!(settings.max_tokens, 300);
        assert_eq!(settings.system_prompt, "Be brief");
        assert!(app.input().is_empty());
    }

    #[tokio::test]
    async fn test_rename_and_search() {
        let mut app = app();
        type_line(&mut app, "/new").await;
        type_line(&mut app, "/rename Trip Planning").await;
        type_line(&mut app, "/new").await;

        type_line(&mut app, "/search trip").await;
        let visible = app.visible_conversations();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name(), "Trip Planning");
    }

    #[tokio::test]
    async fn test_failed_send_shows_apology() {
        let mut app = app();
        type_line(&mut app, "hello there").await;
        assert!(app.pending.is_some());

        let event = app.events_rx.recv().await.unwrap();
        app.handle_event(event).await;

        assert!(app.is_idle());
        let messages = app.conversations().active().unwrap().messages();
        assert_eq!(messages.len(), 2);
        assert!(app.notice().unwrap().starts_with("Request failed"));
    }

    #[tokio::test]
    async fn test_sent_message_is_trimmed() {
        let mut app = app();
        type_line(&mut app, "  hello  \n").await;
        assert!(app.input().is_empty());

        let active = app.conversations().active().unwrap();
        assert_eq!(active.name(), "hello");
        assert_eq!(active.messages()[0], Message::user("hello"));
    }

    #[tokio::test]
    async fn test_discovered_models_replace_missing_saved_model() {
        let mut app = app();
        app.spawn_model_discovery();

        let event = app.events_rx.recv().await.unwrap();
        app.handle_event(event).await;

        assert_eq!(app.settings().settings().model, "llama3");
        type_line(&mut app, "/model nope").await;
        assert_eq!(app.notice(), Some("Unknown model nope"));
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_saved_model() {
        let mut app = app();
        let saved = app.settings().settings().model.clone();

        app.handle_event(AppEvent::ModelsDiscovered(Err(anyhow::anyhow!(
            "connection refused"
        ))))
        .await;

        assert_eq!(app.settings().settings().model, saved);
        assert_eq!(
            app.notice(),
            Some("Could not reach Ollama; keeping saved model")
        );
        assert!(app.models.is_empty());
    }

    #[tokio::test]
    async fn test_example_prompt_is_sent() {
        let mut app = app();
        type_line(&mut app, "/example 2").await;
        assert!(app.pending.is_some());

        let active = app.conversations().active().unwrap();
        assert_eq!(active.name(), "What are the top...");
        assert_eq!(active.messages()[0], Message::user(EXAMPLE_PROMPTS[1]));
    }

    #[tokio::test]
    async fn test_copy_without_reply_explains() {
        let mut app = app();
        type_line(&mut app, "/copy").await;
        assert_eq!(app.notice(), Some("No assistant reply to copy"));

        type_line(&mut app, "/copy-code 2").await;
        assert_eq!(app.notice(), Some("No assistant reply to copy"));
    }

    #[tokio::test]
    async fn test_unknown_command_notice() {
        let mut app = app();
        type_line(&mut app, "/bogus").await;
        assert_eq!(app.notice(), Some("Unknown command /bogus. Try /help"));
    }

    #[tokio::test]
    async fn test_selection_moves_within_visible_list() {
        let mut app = app();
        let older = app.conversations.create().await;
        let newer = app.conversations.create().await;
        assert_eq!(app.conversations().active_id(), Some(newer.id()));

        app.move_selection(1);
        assert_eq!(app.conversations().active_id(), Some(older.id()));
        app.move_selection(1);
        assert_eq!(app.conversations().active_id(), Some(older.id()));
        app.move_selection(-1);
        assert_eq!(app.conversations().active_id(), Some(newer.id()));
    }
}
