//! Copying message text and code blocks to the system clipboard

use anyhow::{Context, Result};
use olly_core::{Message, RenderMode, Role, render};

/// Text of message `number` (1-based, as numbered in the transcript), or of
/// the latest assistant reply when no number is given
pub fn message_text(messages: &[Message], number: Option<usize>) -> Result<&str, String> {
    let message = match number {
        Some(n) => n
            .checked_sub(1)
            .and_then(|index| messages.get(index))
            .ok_or_else(|| format!("No message {}", n))?,
        None => latest_reply(messages)?,
    };
    Ok(message.content.trim())
}

/// Code block `number` (1-based, default the first) of the latest
/// assistant reply
pub fn code_block(messages: &[Message], number: Option<usize>) -> Result<String, String> {
    let reply = latest_reply(messages)?;
    let n = number.unwrap_or(1);

    render(&reply.content, RenderMode::Final)
        .code_blocks()
        .nth(n.saturating_sub(1))
        .map(str::to_string)
        .ok_or_else(|| format!("The last reply has no code block {}", n))
}

fn latest_reply(messages: &[Message]) -> Result<&Message, String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .ok_or_else(|| "No assistant reply to copy".to_string())
}

/// System clipboard, opened on first use. On X11 copied text is only served
/// while the handle is alive, so it lives as long as the app.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().context("Clipboard is not available")?,
        };
        self.inner
            .insert(clipboard)
            .set_text(text.to_string())
            .context("Failed to copy to clipboard")
    }
}
