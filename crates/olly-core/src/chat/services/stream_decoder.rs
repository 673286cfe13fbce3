//! Newline-delimited JSON decoding for streamed chat responses.
//!
//! The server writes one JSON object per line:
//!
//! ```text
//! {"message":{"role":"assistant","content":"Hel"},"done":false}
//! {"message":{"role":"assistant","content":"lo"},"done":false}
//! {"message":{"role":"assistant","content":""},"done":true}
//! ```
//!
//! Network chunks do not line up with lines, so the decoder keeps the
//! unterminated tail of each chunk and prefixes it onto the next one. Lines
//! that fail to decode (keep-alives, garbage, partial writes) are dropped
//! without surfacing an error.

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

/// One decoded record of the response stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamEvent {
    /// Text fragment carried by the record, if any
    pub content: Option<String>,
    /// Completion flag reported by the server
    pub done: bool,
}

impl StreamEvent {
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            content: Some(fragment.into()),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content: None,
            done: true,
        }
    }
}

/// Result of decoding a single candidate line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedLine {
    Event(StreamEvent),
    /// Whitespace-only line
    Blank,
    /// Line that is not a valid record; skipped
    Malformed,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Decode one line of the stream
pub fn decode_line(line: &str) -> DecodedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return DecodedLine::Blank;
    }

    match serde_json::from_str::<WireEvent>(trimmed) {
        Ok(wire) => DecodedLine::Event(StreamEvent {
            content: wire
                .message
                .and_then(|m| m.content)
                .filter(|c| !c.is_empty()),
            done: wire.done,
        }),
        Err(e) => {
            trace!(error = %e, "Dropping malformed stream line");
            DecodedLine::Malformed
        }
    }
}

fn decode_line_bytes(bytes: &[u8]) -> DecodedLine {
    match std::str::from_utf8(bytes) {
        Ok(line) => decode_line(line),
        Err(_) => DecodedLine::Malformed,
    }
}

/// Incremental line splitter + decoder.
///
/// The carry-over is kept as raw bytes so a multi-byte character split
/// across two chunks is reassembled before UTF-8 decoding.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    carry_over: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the events of every line it completed, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.carry_over.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.carry_over[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            if let DecodedLine::Event(event) = decode_line_bytes(&self.carry_over[start..end]) {
                events.push(event);
            }
            start = end + 1;
        }
        self.carry_over.drain(..start);

        events
    }

    /// End of stream. A trailing line without a newline terminator is still
    /// decoded when it forms a complete record; anything else is discarded.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let tail = std::mem::take(&mut self.carry_over);
        match decode_line_bytes(&tail) {
            DecodedLine::Event(event) => Some(event),
            DecodedLine::Blank => None,
            DecodedLine::Malformed => {
                debug!(bytes = tail.len(), "Discarding unterminated trailing line");
                None
            }
        }
    }

    /// Bytes currently held for the next chunk
    pub fn carry_over_len(&self) -> usize {
        self.carry_over.len()
    }
}

/// Adapt a stream of byte chunks into a lazy, in-order stream of events.
///
/// A chunk error is forwarded once and ends the stream.
pub fn decode_stream<S, B, E>(chunks: S) -> impl Stream<Item = Result<StreamEvent, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut decoder = StreamDecoder::new();
        futures::pin_mut!(chunks);

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(bytes.as_ref()) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if let Some(event) = decoder.finish() {
            yield Ok(event);
        }
    }
}
