use crate::chat::models::DEFAULT_CONVERSATION_NAME;

const TITLE_WORDS: usize = 4;

/// Name for a conversation started implicitly by its first message.
///
/// The trimmed message is split on single spaces; the first four pieces are
/// kept and `...` is appended when there are more. Line breaks inside the kept
/// pieces become spaces so the name stays on one line.
pub fn conversation_name(first_message: &str) -> String {
    let words: Vec<&str> = first_message.trim().split(' ').collect();

    let mut title = words
        .iter()
        .take(TITLE_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > TITLE_WORDS {
        title.push_str("...");
    }

    let title = title.replace("\r\n", " ").replace(['\n', '\r'], " ");
    if title.trim().is_empty() {
        DEFAULT_CONVERSATION_NAME.to_string()
    } else {
        title
    }
}
