//! Turn rendered markdown spans into ratatui lines

use olly_core::{MarkdownSpan, RenderedMessage};
use ratatui::layout::Alignment;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::ui::Palette;

const CURSOR: &str = "▌";

struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    alignment: Alignment,
}

impl LineBuilder {
    fn new(alignment: Alignment) -> Self {
        Self {
            lines: Vec::new(),
            current: Vec::new(),
            alignment,
        }
    }

    /// Add text that may contain line breaks
    fn text(&mut self, text: &str, style: Style) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.push(first, style);
        }
        for part in parts {
            self.break_line();
            self.push(part, style);
        }
    }

    fn push(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn break_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines
            .push(Line::from(spans).alignment(self.alignment));
    }

    /// Close the current line only when something is on it
    fn end_block(&mut self) {
        if !self.current.is_empty() {
            self.break_line();
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.end_block();
        self.lines
    }
}

pub fn to_lines(rendered: &RenderedMessage, palette: &Palette) -> Vec<Line<'static>> {
    let alignment = if rendered.direction.is_rtl() {
        Alignment::Right
    } else {
        Alignment::Left
    };
    let base = Style::default().fg(palette.fg);
    let code = Style::default().fg(palette.code);
    let mut out = LineBuilder::new(alignment);

    for span in &rendered.spans {
        match span {
            MarkdownSpan::Text(text) => out.text(text, base),
            MarkdownSpan::Bold(text) => out.text(text, base.add_modifier(Modifier::BOLD)),
            MarkdownSpan::Italic(text) => out.text(text, base.add_modifier(Modifier::ITALIC)),
            MarkdownSpan::InlineCode(text) => out.text(text, code.bg(palette.code_bg)),
            MarkdownSpan::CodeBlock { language, code: body } => {
                out.end_block();
                let label = language.as_deref().unwrap_or("code");
                out.push(&format!("┌ {}", label), Style::default().fg(palette.muted));
                out.break_line();
                for line in body.split('\n') {
                    out.push("│ ", Style::default().fg(palette.muted));
                    out.push(line, code);
                    out.break_line();
                }
            }
            MarkdownSpan::Cursor => out.push(
                CURSOR,
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
        }
    }

    out.finish()
}
