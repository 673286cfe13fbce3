//! Partial markdown renderer for possibly-truncated assistant output
//!
//! Recognizes, left to right:
//! - Fenced code blocks: ```lang\n...\n``` (both fences must be present)
//! - Inline code: `...` (outside fences only)
//! - Bold: **...** and italic: *...* (single line)
//!
//! Anything that does not form a complete pair is kept as literal text, so
//! a fence that is still streaming in shows up as text until its closing
//! marker arrives.

use super::rtl::TextDirection;

const FENCE: [char; 3] = ['`', '`', '`'];
const BOLD: [char; 2] = ['*', '*'];

/// A piece of rendered output
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkdownSpan {
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    InlineCode(String),
    Bold(String),
    Italic(String),
    /// Literal text with original whitespace and line breaks
    Text(String),
    /// Marks the still-growing end of a live response
    Cursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Response still streaming; a cursor is appended
    Live,
    /// Committed message
    Final,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedMessage {
    pub direction: TextDirection,
    pub spans: Vec<MarkdownSpan>,
}

impl RenderedMessage {
    /// Bodies of the fenced code blocks, in order
    pub fn code_blocks(&self) -> impl Iterator<Item = &str> {
        self.spans.iter().filter_map(|span| match span {
            MarkdownSpan::CodeBlock { code, .. } => Some(code.as_str()),
            _ => None,
        })
    }
}

/// Render the full buffer from scratch. Pure; call again on every update.
pub fn render(text: &str, mode: RenderMode) -> RenderedMessage {
    let mut out = SpanBuilder::default();
    split_code(text, &mut out);
    let mut spans = out.finish();

    if mode == RenderMode::Live {
        spans.push(MarkdownSpan::Cursor);
    }

    RenderedMessage {
        direction: TextDirection::detect(text),
        spans,
    }
}

#[derive(Default)]
struct SpanBuilder {
    spans: Vec<MarkdownSpan>,
    text: String,
}

impl SpanBuilder {
    fn literal(&mut self, s: &str) {
        self.text.push_str(s);
    }

    fn literal_char(&mut self, c: char) {
        self.text.push(c);
    }

    fn span(&mut self, span: MarkdownSpan) {
        self.flush();
        self.spans.push(span);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.spans
                .push(MarkdownSpan::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Vec<MarkdownSpan> {
        self.flush();
        self.spans
    }
}

/// Position of the first occurrence of `pattern` in `chars` at or after `from`
fn find(chars: &[char], from: usize, pattern: &[char]) -> Option<usize> {
    if from >= chars.len() {
        return None;
    }
    chars[from..]
        .windows(pattern.len())
        .position(|w| w == pattern)
        .map(|p| from + p)
}

/// First pass: code blocks and inline code. Everything in between goes
/// through the emphasis pass.
fn split_code(text: &str, out: &mut SpanBuilder) {
    let chars: Vec<char> = text.chars().collect();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '`' {
            if chars[i..].starts_with(&FENCE) {
                if let Some(close) = find(&chars, i + 3, &FENCE) {
                    split_emphasis(&std::mem::take(&mut plain), out);
                    out.span(fence_block(&chars[i + 3..close]));
                    i = close + 3;
                    continue;
                }
            }

            if let Some(close) = find(&chars, i + 1, &['`']) {
                if close > i + 1 {
                    split_emphasis(&std::mem::take(&mut plain), out);
                    out.span(MarkdownSpan::InlineCode(chars[i + 1..close].iter().collect()));
                } else {
                    // Empty pair
                    plain.push_str("``");
                }
                i = close + 1;
                continue;
            }
        }

        plain.push(chars[i]);
        i += 1;
    }

    split_emphasis(&plain, out);
}

/// Body between the fences: the first line names the language, the rest is code
fn fence_block(inner: &[char]) -> MarkdownSpan {
    let inner: String = inner.iter().collect();

    match inner.split_once('\n') {
        Some((first_line, rest)) => {
            let language = first_line.trim();
            let code = rest.strip_suffix('\n').unwrap_or(rest);
            let code = code.strip_suffix('\r').unwrap_or(code);
            MarkdownSpan::CodeBlock {
                language: (!language.is_empty()).then(|| language.to_string()),
                code: code.to_string(),
            }
        }
        None => MarkdownSpan::CodeBlock {
            language: None,
            code: inner,
        },
    }
}

/// Second pass over text outside code: bold first, then italic
fn split_emphasis(text: &str, out: &mut SpanBuilder) {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '*' {
            // Markers never pair across a line break
            let line_end = chars[i..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(chars.len(), |p| i + p);
            let line = &chars[..line_end];

            if chars.get(i + 1) == Some(&'*') {
                match find(line, i + 2, &BOLD) {
                    Some(close) if close > i + 2 => {
                        out.span(MarkdownSpan::Bold(chars[i + 2..close].iter().collect()));
                        i = close + 2;
                    }
                    Some(close) => {
                        out.literal("****");
                        i = close + 2;
                    }
                    None => {
                        out.literal("**");
                        i += 2;
                    }
                }
                continue;
            }

            if let Some(close) = find(line, i + 1, &['*']) {
                out.span(MarkdownSpan::Italic(chars[i + 1..close].iter().collect()));
                i = close + 1;
                continue;
            }
        }

        out.literal_char(chars[i]);
        i += 1;
    }

    out.flush();
}
