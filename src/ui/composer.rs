//! Multi-line input box. Enter submits, Shift+Enter inserts a newline.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const PLACEHOLDER: &str = "Type your message...";

/// Result of feeding a key event to the composer.
#[derive(Debug, PartialEq, Eq)]
pub enum ComposerResult {
    /// The user submitted this text; the buffer has been cleared.
    Submitted(String),
    None,
}

/// Editable input state with a byte-indexed cursor.
pub struct Composer {
    content: String,
    cursor: usize,
}

impl Composer {
    pub fn new() -> Self {
        Self {
            content: String::new(),
            cursor: 0,
        }
    }

    /// Current buffer content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Handle key input.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.insert_char('\n');
                } else if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => {
                if let Some(start) = self.prev_char_start() {
                    self.content.remove(start);
                    self.cursor = start;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.content.len() {
                    self.content.remove(self.cursor);
                }
            }
            KeyCode::Left => {
                if let Some(start) = self.prev_char_start() {
                    self.cursor = start;
                }
            }
            KeyCode::Right => {
                if let Some(end) = self.next_char_end() {
                    self.cursor = end;
                }
            }
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor.
    pub fn insert_str(&mut self, text: &str) {
        self.content.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_char_start(&self) -> Option<usize> {
        self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_char_end(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// Render the input box. While a reply is pending the border dims and
    /// the title says so; submissions are gated by the caller.
    pub fn render(&self, area: Rect, buf: &mut Buffer, is_loading: bool) {
        let (title, style) = if is_loading {
            ("Waiting for reply...", Style::default().fg(Color::DarkGray))
        } else {
            (
                "Message — Enter to send, Shift+Enter for newline",
                Style::default().fg(Color::Green),
            )
        };

        let block = Block::default().borders(Borders::ALL).title(title).style(style);
        let inner = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder = Line::from(vec![Span::styled(
                PLACEHOLDER,
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner.x, inner.y, &placeholder, inner.width);
            return;
        }

        let mut content = self.content.clone();
        if !is_loading {
            content.insert(self.cursor.min(content.len()), '▌');
        }

        for (i, line_text) in content.split('\n').enumerate() {
            if i < inner.height as usize {
                let line = Line::from(vec![Span::raw(line_text.to_string())]);
                buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            composer.handle_key(press(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_submits_and_clears_the_buffer() {
        let mut composer = Composer::new();
        type_text(&mut composer, "hello");

        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::Submitted("hello".to_string()));
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn enter_on_whitespace_does_nothing() {
        let mut composer = Composer::new();
        type_text(&mut composer, "   ");

        let result = composer.handle_key(press(KeyCode::Enter));
        assert_eq!(result, ComposerResult::None);
        assert_eq!(composer.content(), "   ");
    }

    #[test]
    fn shift_enter_inserts_a_newline() {
        let mut composer = Composer::new();
        type_text(&mut composer, "line one");

        let result =
            composer.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        assert_eq!(result, ComposerResult::None);
        type_text(&mut composer, "line two");

        assert_eq!(composer.content(), "line one\nline two");
    }

    #[test]
    fn cursor_editing_respects_char_boundaries() {
        let mut composer = Composer::new();
        type_text(&mut composer, "héllo");

        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Left));
        composer.handle_key(press(KeyCode::Backspace));
        assert_eq!(composer.content(), "hélo");

        composer.handle_key(press(KeyCode::Home));
        composer.handle_key(press(KeyCode::Right));
        composer.handle_key(press(KeyCode::Delete));
        assert_eq!(composer.content(), "hlo");
    }

    #[test]
    fn paste_lands_at_the_cursor() {
        let mut composer = Composer::new();
        type_text(&mut composer, "ab");
        composer.handle_key(press(KeyCode::Left));
        composer.insert_str("XY");
        assert_eq!(composer.content(), "aXYb");
    }
}
