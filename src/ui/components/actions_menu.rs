use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

use crate::ui::renderfns::{centered, truncate};

/// Row actions offered for a single word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordAction {
  View,
  Edit,
  Delete,
}

impl WordAction {
  const ALL: [WordAction; 3] = [WordAction::Edit, WordAction::Delete, WordAction::View];

  fn label(self) -> &'static str {
    match self {
      WordAction::View => "View details",
      WordAction::Edit => "Edit",
      WordAction::Delete => "Delete",
    }
  }
}

/// Popup menu listing the actions for the selected row
#[derive(Debug, Clone, Default)]
pub struct ActionsMenu {
  active: bool,
  selected: usize,
  title: String,
}

impl ActionsMenu {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the menu for the word titled `title`
  pub fn show(&mut self, title: &str) {
    self.active = true;
    self.selected = 0;
    self.title = truncate(title, 24);
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<WordAction> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    let count = WordAction::ALL.len();
    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Handled
      }
      KeyCode::Enter => {
        let action = WordAction::ALL[self.selected];
        self.hide();
        KeyResult::Event(action)
      }
      // Direct shortcuts mirror the list view's
      KeyCode::Char('e') => {
        self.hide();
        KeyResult::Event(WordAction::Edit)
      }
      KeyCode::Char('d') => {
        self.hide();
        KeyResult::Event(WordAction::Delete)
      }
      KeyCode::Char('v') => {
        self.hide();
        KeyResult::Event(WordAction::View)
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % count;
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = (self.selected + count - 1) % count;
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the menu overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (self.title.chars().count() as u16 + 6).max(22);
    let overlay_area = centered(area, width, WordAction::ALL.len() as u16 + 2);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = WordAction::ALL
      .iter()
      .map(|action| {
        let color = if *action == WordAction::Delete {
          Color::Red
        } else {
          Color::Cyan
        };
        ListItem::new(Line::from(Span::styled(
          action.label(),
          Style::default().fg(color),
        )))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
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
  fn test_inactive_passes_keys_through() {
    let mut menu = ActionsMenu::new();
    assert_eq!(menu.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_enter_picks_highlighted_action() {
    let mut menu = ActionsMenu::new();
    menu.show("aws");
    assert_eq!(menu.handle_key(key(KeyCode::Enter)), KeyResult::Event(WordAction::Edit));
    assert!(!menu.is_active());

    menu.show("aws");
    menu.handle_key(key(KeyCode::Down));
    assert_eq!(
      menu.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(WordAction::Delete)
    );
  }

  #[test]
  fn test_up_wraps_around() {
    let mut menu = ActionsMenu::new();
    menu.show("aws");
    menu.handle_key(key(KeyCode::Up));
    assert_eq!(menu.handle_key(key(KeyCode::Enter)), KeyResult::Event(WordAction::View));
  }

  #[test]
  fn test_escape_closes_without_action() {
    let mut menu = ActionsMenu::new();
    menu.show("aws");
    assert_eq!(menu.handle_key(key(KeyCode::Esc)), KeyResult::Handled);
    assert!(!menu.is_active());
  }
}
