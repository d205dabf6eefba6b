use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::api::cache::{self, WordsCache, WordsQueryKey};
use crate::api::{Word, WordsApi};
use crate::query::Query;
use crate::ui::renderfns::{source_badge, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

pub const DELETED_MESSAGE: &str = "This word no longer exists.";

/// Read-only view of one word.
///
/// Reads the same cache entry as the list, so edits and deletions made
/// elsewhere show up here on the next tick.
pub struct WordDetailView {
  id: String,
  label: String,
  query: Query<WordsQueryKey, Word>,
}

impl WordDetailView {
  pub fn new(word: Word, api: Arc<dyn WordsApi>, cache: WordsCache) -> Self {
    Self {
      query: cache::all_words(&cache, api),
      label: truncate(&word.literal, 24),
      id: word.id,
    }
  }

  fn word(&self) -> Option<&Word> {
    self.query.data()?.iter().find(|w| w.id == self.id)
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", self.label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph = Paragraph::new("Loading word...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(word) = self.word() else {
      let text = match self.query.error() {
        Some(error) if self.query.data().is_none() => {
          format!("Error: {}\n\nPress 'r' to retry.", error)
        }
        _ => DELETED_MESSAGE.to_string(),
      };
      let paragraph = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    };

    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let timestamp = |at: &chrono::DateTime<chrono::Utc>| at.format("%Y-%m-%d %H:%M UTC").to_string();
    let lines = vec![
      Line::from(vec![
        label("Word:      "),
        Span::styled(&word.literal, Style::default().fg(Color::Cyan).bold()),
      ]),
      Line::from(vec![
        label("Category:  "),
        Span::styled(&word.category, Style::default().fg(Color::Yellow)),
      ]),
      Line::from(vec![
        label("Translated:"),
        Span::raw(" "),
        Span::raw(word.translated.as_deref().unwrap_or("-")),
      ]),
      Line::from(vec![
        label("Language:  "),
        Span::raw(word.language.as_deref().unwrap_or("-")),
      ]),
      Line::from(""),
      Line::from(vec![label("Id:        "), Span::raw(&word.id)]),
      Line::from(vec![label("Owner:     "), Span::raw(&word.user_id)]),
      Line::from(vec![label("Created:   "), Span::raw(timestamp(&word.created_at))]),
      Line::from(vec![label("Updated:   "), Span::raw(timestamp(&word.updated_at))]),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
  }
}

impl View for WordDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.label.clone()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn status_badge(&self) -> Option<(&'static str, Color)> {
    source_badge(self.query.source(), self.query.is_fetching())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
