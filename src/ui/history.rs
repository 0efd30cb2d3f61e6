//! Transcript display component

use crate::events::{Message, Role};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// Bottom-anchored transcript of the conversation.
///
/// Rendering always pins the newest lines to the bottom of the viewport, so
/// the latest content stays visible after every chunk update as well as
/// after the stream ends.
pub struct History<'a> {
    messages: &'a [Message],
    streaming: bool,
}

impl<'a> History<'a> {
    pub fn new(messages: &'a [Message], streaming: bool) -> Self {
        Self {
            messages,
            streaming,
        }
    }

    /// Render a single message into lines
    fn render_message(&self, message: &Message, width: u16, cursor: bool) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        let label = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        let timestamp = message.timestamp.format("%H:%M:%S").to_string();
        let header = format!("{} {} {}", label, timestamp, "─".repeat(20));
        lines.push(Line::from(vec![Span::styled(
            header,
            Style::default().fg(Color::DarkGray),
        )]));

        let style = match message.role {
            Role::User => Style::default().fg(Color::Blue),
            Role::Assistant => Style::default().fg(Color::Green),
        };

        let content_lines = wrap_text(&message.text, width.saturating_sub(2) as usize);
        let last = content_lines.len().saturating_sub(1);
        for (i, content_line) in content_lines.into_iter().enumerate() {
            let mut spans = vec![Span::raw("  "), Span::styled(content_line, style)];
            if cursor && i == last {
                spans.push(Span::styled("▋", Style::default().fg(Color::Yellow)));
            }
            lines.push(Line::from(spans));
        }

        lines
    }
}

impl Widget for History<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Threadline");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.messages.is_empty() {
            let welcome_lines = vec![
                Line::from(vec![Span::styled(
                    "Type a message below to start chatting.",
                    Style::default().fg(Color::Gray),
                )]),
                Line::from(vec![Span::styled(
                    "Press Enter to send. /help lists commands.",
                    Style::default().fg(Color::DarkGray),
                )]),
            ];
            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let mut all_lines: Vec<Line> = Vec::new();
        let last = self.messages.len() - 1;
        for (i, message) in self.messages.iter().enumerate() {
            let cursor = self.streaming && i == last && message.role == Role::Assistant;
            all_lines.extend(self.render_message(message, inner_area.width, cursor));
            // spacing between messages
            all_lines.push(Line::from(vec![Span::raw("")]));
        }

        // Show the tail: newest lines win when the transcript overflows.
        let height = inner_area.height as usize;
        let total = all_lines.len();
        let start = total.saturating_sub(height);
        for (i, line) in all_lines[start..].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Word-wrap text to the given width, preserving explicit line breaks.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line.push_str(word);
            } else if current_line.chars().count() + 1 + word.chars().count() <= width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_text(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.get(x, y).symbol().to_string())
            .collect()
    }

    #[test]
    fn wraps_long_lines_at_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn preserves_explicit_line_breaks() {
        let lines = wrap_text("one\ntwo", 80);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn zero_width_does_not_panic() {
        assert_eq!(wrap_text("anything", 0), vec!["anything"]);
    }

    #[test]
    fn newest_message_is_visible_when_transcript_overflows() {
        let messages: Vec<Message> = (0..20)
            .map(|i| Message::user(format!("message number {i}")))
            .collect();

        let area = Rect::new(0, 0, 40, 8);
        let mut buf = Buffer::empty(area);
        History::new(&messages, false).render(area, &mut buf);

        let rendered: String = (0..area.height).map(|y| row_text(&buf, y)).collect();
        assert!(rendered.contains("message number 19"));
        assert!(!rendered.contains("message number 0 "));
    }
}
