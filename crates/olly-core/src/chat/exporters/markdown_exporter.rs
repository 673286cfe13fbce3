use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use crate::chat::models::Conversation;

lazy_static! {
    /// Whitespace, path separators and characters Windows rejects in file names
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r#"[\s/\\:*?"<>|\x00-\x1f]+"#)
        .expect("UNSAFE_FILE_CHARS pattern is valid");
}

/// Render a conversation as a markdown document.
///
/// This is a pure function with no side effects.
pub fn conversation_to_markdown(conversation: &Conversation) -> String {
    let mut doc = format!("# {}\n\n", conversation.name());
    for message in conversation.messages() {
        doc.push_str(&format!(
            "**{}:**\n{}\n\n---\n\n",
            message.role.label(),
            message.content
        ));
    }
    doc
}

/// File name for an exported conversation.
///
/// Runs of whitespace and of characters that are not allowed in a single path
/// component become `_`, so the result never leaves the export directory.
pub fn export_file_name(conversation: &Conversation) -> String {
    let stem = UNSAFE_FILE_CHARS.replace_all(conversation.name(), "_");
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        "conversation.md".to_string()
    } else {
        format!("{stem}.md")
    }
}

/// Write the markdown export to `target`.
///
/// A directory target receives a file named by [`export_file_name`]; any
/// other path is used as-is. Returns the written path.
pub async fn write_markdown(conversation: &Conversation, target: &Path) -> Result<PathBuf> {
    let path = if tokio::fs::metadata(target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        target.join(export_file_name(conversation))
    } else {
        target.to_path_buf()
    };

    tokio::fs::write(&path, conversation_to_markdown(conversation))
        .await
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    info!(conv_id = %conversation.id(), path = %path.display(), "Exported conversation");
    Ok(path)
}
