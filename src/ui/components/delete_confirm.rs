//! Delete confirmation dialog.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::notifications::Notifier;
use super::KeyResult;
use crate::api::cache::{WordsCache, WordsQueryKey};
use crate::api::{ApiError, Word, WordsApi};
use crate::query::Mutation;
use crate::ui::renderfns::{centered, truncate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
  Closed,
  Confirm,
  Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteEvent {
  /// The server removed the word with this id
  Deleted(String),
  Cancelled,
}

pub struct DeleteConfirm {
  state: DeleteState,
  target: Option<Word>,
  last_error: Option<String>,
  mutation: Mutation<(), ApiError>,
  api: Arc<dyn WordsApi>,
  cache: WordsCache,
  notifier: Notifier,
}

impl DeleteConfirm {
  pub fn new(api: Arc<dyn WordsApi>, cache: WordsCache, notifier: Notifier) -> Self {
    Self {
      state: DeleteState::Closed,
      target: None,
      last_error: None,
      mutation: Mutation::new(),
      api,
      cache,
      notifier,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> DeleteState {
    self.state
  }

  pub fn is_open(&self) -> bool {
    self.state != DeleteState::Closed
  }

  /// Ask for confirmation before deleting `word`
  pub fn open(&mut self, word: &Word) {
    self.target = Some(word.clone());
    self.last_error = None;
    self.mutation.reset();
    self.state = DeleteState::Confirm;
  }

  pub fn close(&mut self) {
    self.mutation.reset();
    self.target = None;
    self.state = DeleteState::Closed;
  }

  pub fn confirm(&mut self) {
    let Some(target) = &self.target else {
      return;
    };
    if self.state != DeleteState::Confirm {
      return;
    }
    self.state = DeleteState::Submitting;
    self.last_error = None;

    let api = Arc::clone(&self.api);
    let id = target.id.clone();
    self.mutation.start(async move { api.delete(&id).await });
  }

  /// Poll the pending request. Call on every tick.
  pub fn tick(&mut self) -> Option<DeleteEvent> {
    if self.state != DeleteState::Submitting {
      return None;
    }
    let result = self.mutation.poll()?;
    let id = self.target.as_ref()?.id.clone();

    match result {
      Ok(()) => {
        let key = WordsQueryKey::All;
        self.cache.remove(&key, &id);
        self.cache.invalidate(&key);
        self.notifier.success("Word deleted successfully");
        self.close();
        Some(DeleteEvent::Deleted(id))
      }
      Err(error) => {
        // Cache untouched; the dialog stays up for another try or a cancel
        self.notifier.error("Failed to delete word");
        self.last_error = Some(error.to_string());
        self.state = DeleteState::Confirm;
        None
      }
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<DeleteEvent> {
    match (self.state, key.code) {
      (DeleteState::Closed, _) => KeyResult::NotHandled,
      (DeleteState::Confirm, KeyCode::Char('y') | KeyCode::Enter) => {
        self.confirm();
        KeyResult::Handled
      }
      (_, KeyCode::Char('n') | KeyCode::Esc) => {
        self.close();
        KeyResult::Event(DeleteEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the dialog if open
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(target) = self.target.as_ref().filter(|_| self.is_open()) else {
      return;
    };

    let overlay_area = centered(area, 46, 7);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Delete word ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut lines = vec![
      Line::from(vec![
        Span::raw("Delete "),
        Span::styled(
          format!("\"{}\"", truncate(&target.literal, 24)),
          Style::default().fg(Color::Yellow).bold(),
        ),
        Span::raw("?"),
      ]),
      Line::default(),
    ];
    lines.push(match (self.state, &self.last_error) {
      (DeleteState::Submitting, _) => {
        Line::from(Span::styled("Deleting...", Style::default().fg(Color::Yellow)))
      }
      (_, Some(error)) => Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red))),
      _ => Line::from(Span::styled(
        "y/Enter: delete  n/Esc: cancel",
        Style::default().fg(Color::DarkGray),
      )),
    });

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
  }
}
