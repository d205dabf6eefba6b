use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the filter input that the parent view applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Filter text changed (on each keystroke, empty string on cancel)
  Changed(String),
  /// Filter submitted: overlay closes, filter persists
  Submitted,
}

/// `/` filter overlay
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// The filter currently applied, also while the overlay is closed
  pub fn query(&self) -> &str {
    self.input.value()
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
  }

  /// Handle a key event.
  /// Call this regardless of active state - it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Event(SearchEvent::Changed(String::new()));
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => KeyResult::Event(SearchEvent::Changed(self.query().to_string())),
      // Swallow everything else while typing
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the filter overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3).intersection(area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Filter ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_slash_activates() {
    let mut search = SearchInput::new();
    assert_eq!(search.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    search.handle_key(key(KeyCode::Char('/')));
    assert!(search.is_active());
  }

  #[test]
  fn test_typing_emits_changes_and_submit_keeps_filter() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    assert_eq!(
      search.handle_key(key(KeyCode::Char('a'))),
      KeyResult::Event(SearchEvent::Changed("a".to_string()))
    );
    assert_eq!(
      search.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(SearchEvent::Submitted)
    );
    assert!(!search.is_active());
    assert_eq!(search.query(), "a");
  }

  #[test]
  fn test_escape_clears_filter() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('a')));
    assert_eq!(
      search.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(SearchEvent::Changed(String::new()))
    );
    assert_eq!(search.query(), "");
  }
}
