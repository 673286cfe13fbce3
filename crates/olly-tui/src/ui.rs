use olly_core::{RenderMode, Role, Theme, render};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::App;
use crate::commands::EXAMPLE_PROMPTS;
use crate::markdown_view::to_lines;

const SIDEBAR_WIDTH: u16 = 30;

/// Colors for one theme
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub muted: Color,
    pub accent: Color,
    pub code: Color,
    pub code_bg: Color,
    pub user: Color,
    pub assistant: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                fg: Color::Gray,
                bg: Color::Black,
                muted: Color::DarkGray,
                accent: Color::LightGreen,
                code: Color::Green,
                code_bg: Color::Rgb(30, 41, 59),
                user: Color::LightBlue,
                assistant: Color::LightGreen,
            },
            Theme::Light => Self {
                fg: Color::Black,
                bg: Color::White,
                muted: Color::Gray,
                accent: Color::Blue,
                code: Color::Rgb(4, 120, 87),
                code_bg: Color::Rgb(226, 232, 240),
                user: Color::Blue,
                assistant: Color::Rgb(4, 120, 87),
            },
        }
    }
}

pub fn draw(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.settings().theme());
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg)),
        frame.area(),
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(frame.area());
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(columns[1]);

    draw_sidebar(frame, app, &palette, columns[0]);
    draw_transcript(frame, app, &palette, rows[0]);
    draw_input(frame, app, &palette, rows[1]);
    draw_status(frame, app, &palette, rows[2]);
}

fn draw_sidebar(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let visible = app.visible_conversations();
    let active_id = app.conversations().active_id();

    let items: Vec<ListItem> = visible
        .iter()
        .map(|c| {
            ListItem::new(Line::from(vec![
                Span::styled(c.name().to_string(), Style::default().fg(palette.fg)),
                Span::styled(
                    format!(" ({})", c.message_count()),
                    Style::default().fg(palette.muted),
                ),
            ]))
        })
        .collect();

    let title = if app.search().is_empty() {
        " Chats ".to_string()
    } else {
        format!(" Chats: \"{}\" ", app.search())
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(visible.iter().position(|c| Some(c.id()) == active_id));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_transcript(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let active = app.conversations().active();

    if let Some(conversation) = active {
        for (index, message) in conversation.messages().iter().enumerate() {
            let color = match message.role {
                Role::User => palette.user,
                Role::Assistant => palette.assistant,
                Role::System => palette.muted,
            };
            lines.push(Line::from(Span::styled(
                format!("[{}] {}", index + 1, message.role.label()),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            lines.extend(to_lines(
                &render(message.content.trim(), RenderMode::Final),
                palette,
            ));
            lines.push(Line::default());
        }
    }

    if let Some(live) = app.live_response() {
        lines.push(Line::from(Span::styled(
            "Assistant",
            Style::default()
                .fg(palette.assistant)
                .add_modifier(Modifier::BOLD),
        )));
        lines.extend(to_lines(&render(live.trim(), RenderMode::Live), palette));
    }

    if lines.is_empty() {
        lines = empty_transcript(palette);
    }

    let title = active
        .map(|c| format!(" {} ", c.name()))
        .unwrap_or_else(|| " New conversation ".to_string());

    // Rows after wrapping, not logical lines, decide where the bottom is
    let transcript = Paragraph::new(lines).wrap(Wrap { trim: false });
    let rows = transcript.line_count(area.width.saturating_sub(2));
    let offset = transcript_offset(rows, area.height.saturating_sub(2), app.scroll_back());

    let transcript = transcript
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.muted))
                .title(title),
        )
        .scroll((offset, 0));
    frame.render_widget(transcript, area);
}

/// Greeting and numbered starter prompts for a conversation with no messages
fn empty_transcript(palette: &Palette) -> Vec<Line<'static>> {
    let muted = Style::default().fg(palette.muted);
    let mut lines = vec![
        Line::from(Span::styled("Start typing to chat. /help lists commands.", muted)),
        Line::default(),
        Line::from(Span::styled("Or try an example with /example <n>:", muted)),
    ];
    lines.extend(EXAMPLE_PROMPTS.iter().enumerate().map(|(i, prompt)| {
        Line::from(vec![
            Span::styled(format!("  {}. ", i + 1), Style::default().fg(palette.accent)),
            Span::styled(*prompt, Style::default().fg(palette.fg)),
        ])
    }));
    lines
}

/// First visible row so the newest output stays in view; `scroll_back`
/// moves up from the bottom
fn transcript_offset(rows: usize, height: u16, scroll_back: u16) -> u16 {
    let bottom = rows.saturating_sub(height as usize);
    let offset = bottom.saturating_sub(scroll_back as usize);
    u16::try_from(offset).unwrap_or(u16::MAX)
}

fn draw_input(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let title = if app.is_idle() {
        " Message (Enter send · /help) "
    } else {
        " Waiting for response (Esc cancel) "
    };
    let border = if app.is_idle() {
        palette.accent
    } else {
        palette.muted
    };

    // Attachments can make the buffer long; show its tail
    let width = area.width.saturating_sub(2) as usize;
    let input = app.input();
    let shown: String = {
        let chars: Vec<char> = input.chars().filter(|c| *c != '\n').collect();
        chars[chars.len().saturating_sub(width.saturating_sub(1))..]
            .iter()
            .collect()
    };

    let paragraph = Paragraph::new(shown.clone())
        .style(Style::default().fg(palette.fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        );
    frame.render_widget(paragraph, area);

    let cursor_x = area.x + 1 + shown.chars().count() as u16;
    frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
}

fn draw_status(frame: &mut Frame, app: &App, palette: &Palette, area: Rect) {
    let settings = app.settings().settings();
    let mut spans = vec![
        Span::styled(
            format!(" {} ", settings.model),
            Style::default().fg(palette.bg).bg(palette.accent),
        ),
        Span::styled(
            format!(" {} ", app.state_label()),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            format!("t={} max={} hist={} ", settings.temperature, settings.max_tokens, settings.history_length),
            Style::default().fg(palette.muted),
        ),
    ];
    if let Some(notice) = app.notice() {
        spans.push(Span::styled(
            notice.to_string(),
            Style::default().fg(palette.fg),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_counts_wrapped_rows() {
        let paragraph = Paragraph::new(vec![
            Line::from("x".repeat(100)),
            Line::from("tail"),
        ])
        .wrap(Wrap { trim: false });

        let rows = paragraph.line_count(10);
        assert_eq!(rows, 11);
        // Three visible rows end on "tail", not inside the long line
        assert_eq!(transcript_offset(rows, 3, 0), 8);
    }

    #[test]
    fn test_empty_transcript_lists_examples() {
        let lines = empty_transcript(&Palette::for_theme(Theme::Dark));
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

        assert_eq!(text.len(), 3 + EXAMPLE_PROMPTS.len());
        assert_eq!(text[3], "  1. Explain quantum computing in simple terms");
        assert!(text[6].starts_with("  4. Generate a Python script"));
    }

    #[test]
    fn test_offset_with_scroll_back() {
        assert_eq!(transcript_offset(20, 5, 0), 15);
        assert_eq!(transcript_offset(20, 5, 4), 11);
        assert_eq!(transcript_offset(20, 5, 50), 0);
        assert_eq!(transcript_offset(3, 5, 0), 0);
    }
}
