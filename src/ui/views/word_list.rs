use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::api::cache::{self, WordsCache, WordsQueryKey};
use crate::api::{Word, WordsApi};
use crate::query::Query;
use crate::ui::components::{
  ActionsMenu, DeleteConfirm, FormEvent, KeyResult, Notifier, SearchEvent, SearchInput,
  WordAction, WordForm,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, source_badge, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::WordDetailView;

/// Placeholder rows shown while the first fetch is pending
pub const SKELETON_ROWS: usize = 5;
const SKELETON_CELL: &str = "░░░░░░░░░░";

pub const EMPTY_MESSAGE: &str = "No words found.";

/// What the table area shows, derived from the query on every render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
  Loading,
  Error,
  Empty,
  Populated,
}

/// View listing every word, with create/edit/delete overlays
pub struct WordListView {
  api: Arc<dyn WordsApi>,
  cache: WordsCache,
  query: Query<WordsQueryKey, Word>,
  table_state: TableState,
  search: SearchInput,
  filter: String,
  menu: ActionsMenu,
  form: WordForm,
  delete: DeleteConfirm,
}

impl WordListView {
  pub fn new(api: Arc<dyn WordsApi>, cache: WordsCache, notifier: Notifier) -> Self {
    let query = cache::all_words(&cache, Arc::clone(&api));
    Self {
      form: WordForm::new(Arc::clone(&api), cache.clone(), notifier.clone()),
      delete: DeleteConfirm::new(Arc::clone(&api), cache.clone(), notifier),
      api,
      cache,
      query,
      table_state: TableState::default(),
      search: SearchInput::new(),
      filter: String::new(),
      menu: ActionsMenu::new(),
    }
  }

  pub fn list_state(&self) -> ListState {
    match self.query.data() {
      None if self.query.is_loading() => ListState::Loading,
      None => ListState::Error,
      Some([]) => ListState::Empty,
      Some(_) => ListState::Populated,
    }
  }

  /// Words passing the current filter, in cache order
  fn visible(&self) -> Vec<&Word> {
    self
      .query
      .data()
      .unwrap_or(&[])
      .iter()
      .filter(|w| w.matches(&self.filter))
      .collect()
  }

  fn selected_word(&self) -> Option<Word> {
    let visible = self.visible();
    // Selection is settled on render; before the first frame the top row counts
    let idx = self
      .table_state
      .selected()
      .unwrap_or(0)
      .min(visible.len().checked_sub(1)?);
    visible.get(idx).map(|w| (*w).clone())
  }

  fn select_id(&mut self, id: &str) {
    if let Some(idx) = self.visible().iter().position(|w| w.id == id) {
      self.table_state.select(Some(idx));
    }
  }

  fn run_action(&mut self, action: WordAction) -> ViewAction {
    let Some(word) = self.selected_word() else {
      return ViewAction::None;
    };
    match action {
      WordAction::Edit => self.form.open_edit(&word),
      WordAction::Delete => self.delete.open(&word),
      WordAction::View => {
        return ViewAction::Push(Box::new(WordDetailView::new(
          word,
          Arc::clone(&self.api),
          self.cache.clone(),
        )));
      }
    }
    ViewAction::None
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.form.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Event(FormEvent::Saved(word)) => {
        self.select_id(&word.id);
        return Some(ViewAction::None);
      }
      _ => return Some(ViewAction::None),
    }

    if self.delete.handle_key(key).is_consumed() {
      return Some(ViewAction::None);
    }

    match self.menu.handle_key(key) {
      KeyResult::NotHandled => {}
      KeyResult::Event(action) => return Some(self.run_action(action)),
      KeyResult::Handled => return Some(ViewAction::None),
    }

    match self.search.handle_key(key) {
      KeyResult::NotHandled => None,
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        self.filter = filter;
        self.table_state.select(Some(0));
        Some(ViewAction::None)
      }
      _ => Some(ViewAction::None),
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.table_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => {
        let last = self.visible().len().saturating_sub(1);
        self.table_state.select(Some(last));
      }
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let action = match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('n') => {
        self.form.open_create();
        ViewAction::None
      }
      KeyCode::Char('e') => self.run_action(WordAction::Edit),
      KeyCode::Char('d') => self.run_action(WordAction::Delete),
      KeyCode::Char('v') => self.run_action(WordAction::View),
      KeyCode::Enter => {
        if let Some(word) = self.selected_word() {
          self.menu.show(&word.literal);
        }
        ViewAction::None
      }
      KeyCode::Esc if !self.filter.is_empty() => {
        self.filter.clear();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => return None,
    };
    Some(action)
  }

  fn title(&self) -> String {
    let mut title = match self.query.data() {
      Some(words) if !self.filter.is_empty() => {
        format!(" Words ({}/{}) ", self.visible().len(), words.len())
      }
      Some(words) => format!(" Words ({}) ", words.len()),
      None => " Words ".to_string(),
    };
    if !self.filter.is_empty() {
      title.push_str(&format!("[/{}] ", self.filter));
    }
    if self.query.is_stale() && self.query.data().is_some() {
      title.push_str("(stale) ");
    }
    title
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let message = match self.list_state() {
      ListState::Error => Some((
        format!(
          "Failed to load words: {}\n\nPress 'r' to retry.",
          self.query.error().unwrap_or("unknown error")
        ),
        Color::Red,
      )),
      ListState::Empty => Some((EMPTY_MESSAGE.to_string(), Color::DarkGray)),
      ListState::Populated if self.visible().is_empty() => Some((
        format!("No words match \"{}\".", self.filter),
        Color::DarkGray,
      )),
      _ => None,
    };
    if let Some((text, color)) = message {
      let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(color));
      frame.render_widget(paragraph, area);
      return;
    }

    let rows: Vec<Row> = if self.list_state() == ListState::Loading {
      (0..SKELETON_ROWS)
        .map(|_| {
          Row::new(vec![SKELETON_CELL; 4]).style(Style::default().fg(Color::DarkGray))
        })
        .collect()
    } else {
      self
        .visible()
        .into_iter()
        .map(|word| {
          Row::new(vec![
            Cell::from(truncate(&word.literal, 40)).style(Style::default().fg(Color::Cyan)),
            Cell::from(truncate(&word.category, 20)),
            Cell::from(format_date(&word.created_at)),
            Cell::from("⋯").style(Style::default().fg(Color::DarkGray)),
          ])
        })
        .collect()
    };

    let len = rows.len();
    if self.list_state() == ListState::Loading {
      self.table_state.select(None);
    } else {
      ensure_valid_selection(&mut self.table_state, len);
    }

    let header = Row::new(vec!["WORD", "CATEGORY", "CREATED", ""])
      .style(Style::default().fg(Color::Yellow).bold());
    let widths = [
      Constraint::Percentage(40),
      Constraint::Percentage(25),
      Constraint::Length(14),
      Constraint::Length(3),
    ];

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for WordListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.search.render_overlay(frame, area);
    self.menu.render_overlay(frame, area);
    self.form.render_overlay(frame, area);
    self.delete.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Words".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    if let Some(FormEvent::Saved(word)) = self.form.tick() {
      self.select_id(&word.id);
    }
    self.delete.tick();
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn is_capturing_input(&self) -> bool {
    self.search.is_active() || self.form.is_open() || self.delete.is_open() || self.menu.is_active()
  }

  fn status_badge(&self) -> Option<(&'static str, Color)> {
    source_badge(self.query.source(), self.query.is_fetching())
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "filter").with_priority(20),
      ShortcutInfo::new("n", "new").with_priority(30),
      ShortcutInfo::new("enter", "actions").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::MockWordsApi;
  use crate::api::fixtures::word;
  use crate::api::ApiError;
  use crate::cache::NoopStorage;
  use crate::ui::components::Notifications;
  use crossterm::event::KeyModifiers;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn view_with(api: MockWordsApi, cache: &WordsCache) -> WordListView {
    let (notifier, _notifications) = Notifications::channel(Duration::from_secs(5));
    WordListView::new(Arc::new(api), cache.clone(), notifier)
  }

  fn cache() -> WordsCache {
    WordsCache::new(Arc::new(NoopStorage))
  }

  fn listing(words: Vec<Word>) -> MockWordsApi {
    let mut api = MockWordsApi::new();
    api.expect_list_all().returning(move || Ok(words.clone()));
    api
  }

  fn render_lines(view: &mut WordListView) -> Vec<String> {
    let mut terminal = Terminal::new(TestBackend::new(80, 14)).unwrap();
    terminal.draw(|f| view.render(f, f.area())).unwrap();
    let buffer = terminal.backend().buffer();
    (0..buffer.area.height)
      .map(|y| {
        (0..buffer.area.width)
          .map(|x| buffer[(x, y)].symbol())
          .collect::<String>()
      })
      .collect()
  }

  #[tokio::test]
  async fn test_absent_entry_renders_exactly_five_skeleton_rows() {
    let mut view = view_with(listing(vec![]), &cache());
    assert_eq!(view.list_state(), ListState::Loading);

    let lines = render_lines(&mut view);
    let skeletons = lines.iter().filter(|l| l.contains(SKELETON_CELL)).count();
    assert_eq!(skeletons, SKELETON_ROWS);
    assert!(!lines.iter().any(|l| l.contains(EMPTY_MESSAGE)));
  }

  #[tokio::test]
  async fn test_empty_list_shows_message() {
    let mut view = view_with(listing(vec![]), &cache());
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    assert_eq!(view.list_state(), ListState::Empty);
    let lines = render_lines(&mut view);
    assert!(lines.iter().any(|l| l.contains(EMPTY_MESSAGE)));
    assert!(!lines.iter().any(|l| l.contains(SKELETON_CELL)));
  }

  #[tokio::test]
  async fn test_rows_show_literal_category_and_date() {
    let mut view = view_with(
      listing(vec![word("1", "aws", "cloud"), word("2", "docker", "tool")]),
      &cache(),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    let lines = render_lines(&mut view);
    let row = lines.iter().find(|l| l.contains("docker")).unwrap();
    assert!(row.contains("tool"));
    assert!(row.contains("Mar 14, 2025"));
    assert!(lines.iter().any(|l| l.contains("Words (2)")));
  }

  #[tokio::test]
  async fn test_fetch_error_offers_retry() {
    let mut api = MockWordsApi::new();
    api
      .expect_list_all()
      .times(1)
      .returning(|| Err(ApiError::network("connection refused")));
    let mut view = view_with(api, &cache());
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    assert_eq!(view.list_state(), ListState::Error);
    let lines = render_lines(&mut view).join("\n");
    assert!(lines.contains("Press 'r' to retry."));
    assert!(lines.contains("connection refused"));
  }

  #[tokio::test]
  async fn test_retry_shows_skeleton_until_fetch_settles() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut api = MockWordsApi::new();
    api.expect_list_all().times(2).returning({
      let calls = Arc::clone(&calls);
      move || match calls.fetch_add(1, Ordering::SeqCst) {
        0 => Err(ApiError::network("connection refused")),
        _ => Ok(vec![]),
      }
    });
    let mut view = view_with(api, &cache());
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();
    assert_eq!(view.list_state(), ListState::Error);

    view.handle_key(key(KeyCode::Char('r')));
    assert_eq!(view.list_state(), ListState::Loading);
    let lines = render_lines(&mut view);
    let skeletons = lines.iter().filter(|l| l.contains(SKELETON_CELL)).count();
    assert_eq!(skeletons, SKELETON_ROWS);
    assert!(!lines.iter().any(|l| l.contains("Press 'r' to retry.")));

    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();
    assert_eq!(view.list_state(), ListState::Empty);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_filter_narrows_rows() {
    let mut view = view_with(
      listing(vec![word("1", "aws", "cloud"), word("2", "docker", "tool")]),
      &cache(),
    );
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    view.handle_key(key(KeyCode::Char('/')));
    for c in "dock".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));

    assert_eq!(view.visible().len(), 1);
    assert_eq!(view.selected_word().unwrap().id, "2");
    let lines = render_lines(&mut view);
    assert!(!lines.iter().any(|l| l.contains("aws")));
  }

  #[tokio::test]
  async fn test_enter_opens_menu_and_edit_prefills_form() {
    let cache = cache();
    let mut view = view_with(listing(vec![word("1", "aws", "cloud")]), &cache);
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    view.handle_key(key(KeyCode::Enter));
    assert!(view.menu.is_active());
    view.handle_key(key(KeyCode::Enter)); // first entry is Edit

    assert!(view.form.is_open());
    assert_eq!(view.form.input(), crate::api::WordInput::new("aws", "cloud"));
    assert!(view.is_capturing_input());
  }

  #[tokio::test]
  async fn test_v_pushes_detail_view() {
    let mut view = view_with(listing(vec![word("1", "aws", "cloud")]), &cache());
    tokio::time::sleep(Duration::from_millis(10)).await;
    view.tick();

    assert!(matches!(
      view.handle_key(key(KeyCode::Char('v'))),
      ViewAction::Push(_)
    ));
  }

  #[tokio::test]
  async fn test_keys_without_selection_are_ignored() {
    let mut view = view_with(listing(vec![]), &cache());
    assert!(matches!(
      view.handle_key(key(KeyCode::Char('d'))),
      ViewAction::None
    ));
    assert!(!view.delete.is_open());
  }
}
