use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command, CommandAction};
use crate::ui::renderfns::centered;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// What the `:` prompt produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  Run(CommandAction),
  /// Submitted text that names no command, trimmed and lowercased
  Unknown(String),
  Cancelled,
}

/// `:` prompt with ranked suggestions.
///
/// Tab/Down and BackTab/Up cycle the highlighted suggestion; Enter runs it.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  highlighted: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.highlighted = 0;
  }

  fn deactivate(&mut self) {
    self.active = false;
    self.input.clear();
    self.highlighted = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  pub fn highlighted(&self) -> usize {
    self.highlighted
  }

  /// Move the highlight by `delta`, wrapping at both ends
  fn cycle(&mut self, delta: isize) {
    let len = self.suggestions().len() as isize;
    if len > 0 {
      self.highlighted = (self.highlighted as isize + delta).rem_euclid(len) as usize;
    }
  }

  fn submit(&mut self) -> CommandEvent {
    let event = match self.suggestions().get(self.highlighted) {
      Some(cmd) => CommandEvent::Run(cmd.action),
      None => CommandEvent::Unknown(self.input.value().trim().to_lowercase()),
    };
    self.deactivate();
    event
  }

  /// Feed every key here; `:` opens the prompt while it is closed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => self.cycle(1),
      KeyCode::BackTab | KeyCode::Up => self.cycle(-1),
      _ => match self.input.handle_key(key) {
        InputResult::Submitted(_) => return KeyResult::Event(self.submit()),
        InputResult::Cancelled => {
          self.deactivate();
          return KeyResult::Event(CommandEvent::Cancelled);
        }
        // Text changed (or the key meant nothing to the prompt)
        InputResult::Consumed => self.highlighted = 0,
        InputResult::NotHandled => {}
      },
    }
    KeyResult::Handled
  }

  /// Prompt near the top of `area` with suggestions underneath
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;
    let width = (area.width * 60 / 100).clamp(30, 60);
    let mut popup = centered(area, width, 3 + shown);
    popup.y = area.y + 1;
    let popup = popup.intersection(area);

    frame.render_widget(Clear, popup);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(popup);
    frame.render_widget(block, popup);
    if inner.height == 0 {
      return;
    }

    let [prompt_area, list_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let (before, after) = self.input.split_at_cursor();
    let prompt = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(prompt), prompt_area);

    if suggestions.is_empty() || list_area.height == 0 {
      return;
    }
    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(
            format!("{:<16}", cmd.aliases.join(",")),
            Style::default().fg(Color::Gray),
          ),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();
    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.highlighted));
    frame.render_stateful_widget(list, list_area, &mut state);
  }
}
