//! Scrollable message list, anchored to the latest message.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::conversation::{ConversationState, Message, MessageRole};
use crate::markdown::{self, Segment};

/// Message list widget borrowing the conversation for one frame.
pub struct ChatHistory<'a> {
    conversation: &'a ConversationState,
}

impl<'a> ChatHistory<'a> {
    pub fn new(conversation: &'a ConversationState) -> Self {
        Self { conversation }
    }
}

impl Widget for ChatHistory<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner = block.inner(area);
        block.render(area, buf);

        let width = inner.width.saturating_sub(2) as usize;
        let mut all_lines: Vec<Line<'static>> = Vec::new();
        for message in self.conversation.messages() {
            all_lines.extend(message_lines(message, width));
            // spacing between messages
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        if self.conversation.is_loading() {
            all_lines.push(thinking_line());
        }

        // Show the most recent lines, auto-scrolled to the latest message.
        let height = inner.height as usize;
        let total = all_lines.len();
        let start = total.saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner.x, inner.y + i as u16, line, inner.width);
        }
    }
}

/// Render one message as a header line plus wrapped, styled content lines.
fn message_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let role_icon = match message.role {
        MessageRole::User => "👤",
        MessageRole::Model => "🤖",
        MessageRole::Error => "❌",
    };
    let timestamp = chrono::DateTime::from_timestamp_millis(message.timestamp)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let header = format!("{} {} {}", role_icon, timestamp, "─".repeat(20));
    lines.push(Line::from(vec![Span::styled(
        header,
        Style::default().fg(Color::DarkGray),
    )]));

    let base = content_style(message.role);
    // Rows of styled text, flushed into wrapped lines as they complete.
    let mut row: Vec<(String, Style)> = Vec::new();

    for segment in markdown::parse(&message.text) {
        match segment {
            Segment::Plain(text) => {
                for (i, part) in text.split('\n').enumerate() {
                    if i > 0 {
                        flush_row(&mut row, width, &mut lines);
                    }
                    if !part.is_empty() {
                        row.push((part.to_string(), base));
                    }
                }
            }
            Segment::Bold(text) => row.push((text, base.add_modifier(Modifier::BOLD))),
            Segment::Italic(text) => row.push((text, base.add_modifier(Modifier::ITALIC))),
            Segment::InlineCode(text) => {
                row.push((text, Style::default().fg(Color::Yellow)));
            }
            Segment::CodeBlock { lang, body } => {
                flush_row(&mut row, width, &mut lines);
                if let Some(lang) = lang {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(lang, Style::default().fg(Color::DarkGray)),
                    ]));
                }
                // Code is rendered verbatim, line breaks preserved.
                for code_line in body.split('\n') {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(code_line.to_string(), Style::default().fg(Color::Cyan)),
                    ]));
                }
            }
        }
    }
    flush_row(&mut row, width, &mut lines);

    lines
}

fn content_style(role: MessageRole) -> Style {
    match role {
        MessageRole::User => Style::default().fg(Color::Blue),
        MessageRole::Model => Style::default().fg(Color::Green),
        MessageRole::Error => Style::default().fg(Color::Red),
    }
}

fn thinking_line() -> Line<'static> {
    let dots = match (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        / 300)
        % 4
    {
        0 => ".",
        1 => "..",
        2 => "...",
        _ => "   ",
    };

    Line::from(vec![
        Span::styled("🤖 ", Style::default().fg(Color::Green)),
        Span::styled("Gemini is thinking", Style::default().fg(Color::Green)),
        Span::styled(dots, Style::default().fg(Color::Yellow)),
    ])
}

/// Wrap a row of styled text into indented lines of at most `width` cells.
fn flush_row(row: &mut Vec<(String, Style)>, width: usize, lines: &mut Vec<Line<'static>>) {
    if row.is_empty() {
        return;
    }
    for mut line in wrap_styled(row, width) {
        line.spans.insert(0, Span::raw("  "));
        lines.push(line);
    }
    row.clear();
}

/// Character-exact wrapping that keeps each span's style.
fn wrap_styled(parts: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    if width == 0 {
        let spans: Vec<Span<'static>> = parts
            .iter()
            .map(|(text, style)| Span::styled(text.clone(), *style))
            .collect();
        return vec![Line::from(spans)];
    }

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;

    for (text, style) in parts {
        let mut chunk = String::new();
        for ch in text.chars() {
            if used >= width {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), *style));
                }
                lines.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            chunk.push(ch);
            used += 1;
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, *style));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }

    lines
}
