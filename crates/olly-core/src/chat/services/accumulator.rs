use super::stream_decoder::StreamEvent;

/// Growing text buffer for one in-flight assistant response.
///
/// Fragments are concatenated in arrival order, never reordered or
/// deduplicated.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    buffer: String,
    finished: bool,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over for a new request
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.finished = false;
    }

    /// Fold one event into the buffer.
    ///
    /// Returns the full buffer when the event carried text, so the caller can
    /// repaint; fragment-less events (heartbeats, the final status record)
    /// return `None`.
    pub fn apply(&mut self, event: &StreamEvent) -> Option<&str> {
        if event.done {
            self.finished = true;
        }

        let fragment = event.content.as_deref()?;
        self.buffer.push_str(fragment);
        Some(&self.buffer)
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Graceful completion: hand over the full message content
    pub fn finish(&mut self) -> String {
        self.finished = true;
        std::mem::take(&mut self.buffer)
    }

    /// Cancellation: drop whatever arrived
    pub fn discard(&mut self) {
        self.reset();
    }
}
