//! Create/edit form overlay for a single word.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::debug;

use super::input::{InputResult, TextInput};
use super::notifications::Notifier;
use super::KeyResult;
use crate::api::cache::{WordsCache, WordsQueryKey};
use crate::api::validation::{Field, FieldErrors};
use crate::api::{ApiError, Word, WordInput, WordsApi};
use crate::query::{Mutation, MutationError};
use crate::ui::renderfns::centered;

/// Lifecycle of one form instance.
///
/// `Validating`, `Success` and `Failed` are passed through on the way to
/// the next resting state (`Open`, `Submitting` or `Closed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
  Closed,
  Open,
  Validating,
  Submitting,
  Success,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
  Create,
  /// Editing the word with this id; fields were copied from it on open
  Edit { id: String },
}

impl FormMode {
  fn title(&self) -> &'static str {
    match self {
      FormMode::Create => " New word ",
      FormMode::Edit { .. } => " Edit word ",
    }
  }

  fn success_message(&self) -> &'static str {
    match self {
      FormMode::Create => "Word created successfully",
      FormMode::Edit { .. } => "Word updated successfully",
    }
  }

  fn failure_message(&self) -> &'static str {
    match self {
      FormMode::Create => "Failed to create word",
      FormMode::Edit { .. } => "Failed to update word",
    }
  }
}

/// Events emitted to the parent view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// The server confirmed the word and the cache was patched
  Saved(Word),
  /// Dismissed by the user
  Closed,
}

pub struct WordForm {
  state: FormState,
  mode: FormMode,
  literal: TextInput,
  category: TextInput,
  focus: Field,
  errors: FieldErrors,
  /// Message of the last failed submission, shown until the next attempt
  last_error: Option<String>,
  mutation: Mutation<Word, ApiError>,
  api: Arc<dyn WordsApi>,
  cache: WordsCache,
  notifier: Notifier,
}

impl WordForm {
  pub fn new(api: Arc<dyn WordsApi>, cache: WordsCache, notifier: Notifier) -> Self {
    Self {
      state: FormState::Closed,
      mode: FormMode::Create,
      literal: TextInput::new(),
      category: TextInput::new(),
      focus: Field::Literal,
      errors: FieldErrors::default(),
      last_error: None,
      mutation: Mutation::new(),
      api,
      cache,
      notifier,
    }
  }

  #[cfg(test)]
  pub fn state(&self) -> FormState {
    self.state
  }

  pub fn is_open(&self) -> bool {
    self.state != FormState::Closed
  }

  #[cfg(test)]
  pub fn errors(&self) -> &FieldErrors {
    &self.errors
  }

  /// Current (unvalidated) field values
  pub fn input(&self) -> WordInput {
    WordInput::new(self.literal.value(), self.category.value())
  }

  fn open(&mut self, mode: FormMode, literal: TextInput, category: TextInput) {
    self.mode = mode;
    self.literal = literal;
    self.category = category;
    self.focus = Field::Literal;
    self.errors = FieldErrors::default();
    self.last_error = None;
    self.mutation.reset();
    self.state = FormState::Open;
  }

  /// Open with empty fields for a new word
  pub fn open_create(&mut self) {
    self.open(FormMode::Create, TextInput::new(), TextInput::new());
  }

  /// Open pre-filled from `word`. Later cache changes do not touch the fields.
  pub fn open_edit(&mut self, word: &Word) {
    let input = WordInput::from_word(word);
    self.open(
      FormMode::Edit {
        id: word.id.clone(),
      },
      TextInput::with_value(input.literal),
      TextInput::with_value(input.category),
    );
  }

  /// Dismiss the form. A request still in flight finishes, but its result is dropped.
  pub fn close(&mut self) {
    if self.state == FormState::Submitting {
      debug!(mode = ?self.mode, "form closed during submission, result will be ignored");
    }
    self.mutation.reset();
    self.state = FormState::Closed;
  }

  /// Validate locally, then send the request if the input passes.
  pub fn submit(&mut self) {
    if self.state != FormState::Open {
      return;
    }
    self.state = FormState::Validating;
    self.last_error = None;

    let valid = match self.input().validate() {
      Ok(valid) => valid,
      Err(errors) => {
        debug!(%errors, "form input rejected locally");
        self.focus = if errors.get(Field::Literal).is_some() {
          Field::Literal
        } else {
          Field::Category
        };
        self.errors = errors;
        self.state = FormState::Open;
        return;
      }
    };

    self.errors = FieldErrors::default();
    self.state = FormState::Submitting;

    let api = Arc::clone(&self.api);
    match self.mode.clone() {
      FormMode::Create => self
        .mutation
        .start(async move { api.create(&valid).await }),
      FormMode::Edit { id } => self
        .mutation
        .start(async move { api.update(&id, &valid).await }),
    }
  }

  /// Advance the state machine. Call on every tick.
  pub fn tick(&mut self) -> Option<FormEvent> {
    match self.state {
      FormState::Success => {
        self.state = FormState::Closed;
        None
      }
      FormState::Submitting => match self.mutation.poll()? {
        Ok(word) => Some(self.on_saved(word)),
        Err(error) => {
          self.on_failed(error);
          None
        }
      },
      _ => None,
    }
  }

  fn on_saved(&mut self, word: Word) -> FormEvent {
    let key = WordsQueryKey::All;
    match self.mode {
      FormMode::Create => self.cache.append(&key, word.clone()),
      FormMode::Edit { .. } => self.cache.replace(&key, word.clone()),
    }
    self.cache.invalidate(&key);
    self.notifier.success(self.mode.success_message());
    self.state = FormState::Success;
    FormEvent::Saved(word)
  }

  fn on_failed(&mut self, error: MutationError<ApiError>) {
    self.state = FormState::Failed;
    self.notifier.error(self.mode.failure_message());
    self.last_error = Some(error.to_string());
    // Input is kept for another try
    self.state = FormState::Open;
  }

  fn focused_input(&mut self) -> &mut TextInput {
    match self.focus {
      Field::Literal => &mut self.literal,
      Field::Category => &mut self.category,
    }
  }

  fn toggle_focus(&mut self) {
    self.focus = match self.focus {
      Field::Literal => Field::Category,
      Field::Category => Field::Literal,
    };
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    match self.state {
      FormState::Closed => return KeyResult::NotHandled,
      FormState::Open => {}
      // Only dismissal while a request is out or a result is being shown
      _ => {
        if key.code == KeyCode::Esc {
          self.close();
          return KeyResult::Event(FormEvent::Closed);
        }
        return KeyResult::Handled;
      }
    }

    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
        self.toggle_focus();
        return KeyResult::Handled;
      }
      KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.submit();
        return KeyResult::Handled;
      }
      _ => {}
    }

    let focus = self.focus;
    match self.focused_input().handle_key(key) {
      InputResult::Cancelled => {
        self.close();
        KeyResult::Event(FormEvent::Closed)
      }
      InputResult::Submitted(_) => {
        // Enter on the first field moves on, on the last one submits
        if focus == Field::Literal {
          self.focus = Field::Category;
        } else {
          self.submit();
        }
        KeyResult::Handled
      }
      InputResult::Consumed => {
        self.errors.clear(focus);
        KeyResult::Handled
      }
      InputResult::NotHandled => KeyResult::Handled,
    }
  }

  fn field_lines<'a>(&'a self, field: Field, input: &'a TextInput) -> Vec<Line<'a>> {
    let focused = self.focus == field && self.state == FormState::Open;
    let label_style = if focused {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    let (before, after) = input.split_at_cursor();
    let mut value = vec![Span::raw(" "), Span::raw(before)];
    if focused {
      value.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    value.push(Span::raw(after));

    let mut lines = vec![
      Line::from(Span::styled(format!("{}:", field.label()), label_style)),
      Line::from(value),
    ];
    match self.errors.get(field) {
      Some(message) => lines.push(Line::from(Span::styled(
        format!(" {message}"),
        Style::default().fg(Color::Red),
      ))),
      None => lines.push(Line::default()),
    }
    lines
  }

  /// Render the form overlay if open
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.is_open() {
      return;
    }

    let overlay_area = centered(area, 50, 12);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(self.mode.title());
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let mut lines = self.field_lines(Field::Literal, &self.literal);
    lines.extend(self.field_lines(Field::Category, &self.category));

    let status = match (self.state, &self.last_error) {
      (FormState::Submitting, _) => {
        Span::styled("Saving...", Style::default().fg(Color::Yellow))
      }
      (FormState::Success, _) => Span::styled("Saved", Style::default().fg(Color::Green)),
      (_, Some(error)) => Span::styled(error.as_str(), Style::default().fg(Color::Red)),
      _ => Span::styled(
        "Enter: next/save  Tab: switch field  Esc: cancel",
        Style::default().fg(Color::DarkGray),
      ),
    };
    lines.push(Line::from(status));

    frame.render_widget(Paragraph::new(lines), inner);
  }
}
