use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    Submitted(String),
    None,
}

/// Single-line input box for composing the next message
#[derive(Debug, Clone)]
pub struct Composer {
    content: String,
    /// Cursor position in characters, not bytes.
    cursor: usize,
    placeholder: String,
    has_focus: bool,
}

impl Composer {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            cursor: 0,
            placeholder: placeholder.into(),
            has_focus: true,
        }
    }

    /// Handle key input. Enter submits the current content; everything else
    /// edits it in place.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        match key.code {
            KeyCode::Enter => {
                if !self.content.trim().is_empty() {
                    let content = std::mem::take(&mut self.content);
                    self.cursor = 0;
                    return ComposerResult::Submitted(content);
                }
            }
            KeyCode::Char(c) => {
                let at = self.byte_offset(self.cursor);
                self.content.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let at = self.byte_offset(self.cursor - 1);
                    self.content.remove(at);
                    self.cursor -= 1;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.char_count() {
                    let at = self.byte_offset(self.cursor);
                    self.content.remove(at);
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.char_count();
            }
            _ => {}
        }

        ComposerResult::None
    }

    /// Put text back into the composer, e.g. when a submission was rejected
    /// because an exchange is still in flight.
    pub fn set_content(&mut self, content: &str) {
        self.content = content.to_string();
        self.cursor = self.char_count();
    }

    #[allow(dead_code)]
    pub fn set_focus(&mut self, has_focus: bool) {
        self.has_focus = has_focus;
    }

    #[allow(dead_code)]
    pub fn content(&self) -> &str {
        &self.content
    }

    fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    /// Byte offset of the given character position; always a char boundary.
    fn byte_offset(&self, chars: usize) -> usize {
        self.content
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }
}

impl Widget for &Composer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Message")
            .style(if self.has_focus {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::Gray)
            });

        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.content.is_empty() {
            let placeholder_line = Line::from(vec![Span::styled(
                self.placeholder.clone(),
                Style::default().fg(Color::DarkGray),
            )]);
            buf.set_line(inner_area.x, inner_area.y, &placeholder_line, inner_area.width);
        } else {
            let mut content = self.content.clone();
            if self.has_focus {
                let at = self.byte_offset(self.cursor);
                content.insert(at, '▌');
            }
            let line = Line::from(vec![Span::raw(content)]);
            buf.set_line(inner_area.x, inner_area.y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(composer: &mut Composer, code: KeyCode) -> ComposerResult {
        composer.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(composer: &mut Composer, text: &str) {
        for c in text.chars() {
            press(composer, KeyCode::Char(c));
        }
    }

    #[test]
    fn enter_submits_and_clears_the_content() {
        let mut composer = Composer::new("say something");
        type_text(&mut composer, "Hello");

        assert_eq!(
            press(&mut composer, KeyCode::Enter),
            ComposerResult::Submitted("Hello".to_string())
        );
        assert_eq!(composer.content(), "");
    }

    #[test]
    fn enter_on_blank_content_does_nothing() {
        let mut composer = Composer::new("say something");
        type_text(&mut composer, "   ");
        assert_eq!(press(&mut composer, KeyCode::Enter), ComposerResult::None);
    }

    #[test]
    fn editing_respects_multibyte_characters() {
        let mut composer = Composer::new("");
        type_text(&mut composer, "héllo");
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Left);
        press(&mut composer, KeyCode::Backspace);
        assert_eq!(composer.content(), "hllo");
    }

    #[test]
    fn set_content_restores_rejected_input() {
        let mut composer = Composer::new("");
        composer.set_content("not yet sent");
        assert_eq!(composer.content(), "not yet sent");
        assert_eq!(
            press(&mut composer, KeyCode::Enter),
            ComposerResult::Submitted("not yet sent".to_string())
        );
    }
}
