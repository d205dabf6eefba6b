use crate::api::cache::WordsCache;
use crate::api::WordsApi;
use crate::commands::CommandAction;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Notifications, Notifier};
use crate::ui::renderfns::{draw_footer, draw_header};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::WordListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const TOAST_TTL: Duration = Duration::from_secs(4);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command overlay
  command_input: CommandInput,

  /// Toasts, fed by views through `notifier`
  notifications: Notifications,
  notifier: Notifier,

  /// Header title (config title or the API host)
  title: String,
  host: String,

  api: Arc<dyn WordsApi>,
  cache: WordsCache,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(
    api: Arc<dyn WordsApi>,
    cache: WordsCache,
    title: Option<String>,
    host: String,
  ) -> Self {
    let (notifier, notifications) = Notifications::channel(TOAST_TTL);
    let root = WordListView::new(Arc::clone(&api), cache.clone(), notifier.clone());
    Self {
      view_stack: vec![Box::new(root)],
      command_input: CommandInput::new(),
      notifications,
      notifier,
      title: title.unwrap_or_else(|| host.clone()),
      host,
      api,
      cache,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!(host = %self.host, "started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal, also when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
    self.notifications.tick();
  }

  fn current_view(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  fn handle_key(&mut self, key: KeyEvent) {
    // Ctrl-C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // A view taking text input owns the keyboard, `:` included
    let capturing = self
      .view_stack
      .last()
      .is_some_and(|view| view.is_capturing_input());

    if !capturing {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(action)) => {
          self.execute_command(action);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(text)) => {
          if !text.is_empty() {
            self.notifier.error(format!("Unknown command: {text}"));
          }
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.current_view() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        debug!(view = %view.breadcrumb_label(), "push view");
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        // The root view stays; quitting is explicit
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        }
      }
    }
  }

  fn execute_command(&mut self, action: CommandAction) {
    debug!(?action, "execute command");
    match action {
      CommandAction::Words => self.reset_root(),
      CommandAction::Refresh => {
        if let Some(view) = self.current_view() {
          view.refresh();
        }
      }
      CommandAction::Quit => self.should_quit = true,
    }
  }

  fn reset_root(&mut self) {
    let root = WordListView::new(
      Arc::clone(&self.api),
      self.cache.clone(),
      self.notifier.clone(),
    );
    self.view_stack = vec![Box::new(root)];
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Footer
      ])
      .split(frame.area());

    let breadcrumb = self.breadcrumb();

    if let Some(view) = self.view_stack.last_mut() {
      draw_header(
        frame,
        chunks[0],
        &self.title,
        &self.host,
        view.status_badge(),
        &view.shortcuts(),
      );
      view.render(frame, chunks[1]);
    }

    draw_footer(frame, chunks[2], &breadcrumb);
    self.notifications.render(frame, chunks[1]);
    self.command_input.render_overlay(frame, chunks[1]);
  }

  fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::MockWordsApi;
  use crate::api::fixtures::word;
  use crate::cache::NoopStorage;
  use ratatui::backend::TestBackend;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app() -> App {
    let mut api = MockWordsApi::new();
    api
      .expect_list_all()
      .returning(|| Ok(vec![word("w1", "docker", "tool")]));
    App::new(
      Arc::new(api),
      WordsCache::new(Arc::new(NoopStorage)),
      None,
      "vocab.example.com".to_string(),
    )
  }

  fn type_command(app: &mut App, cmd: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in cmd.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_title_falls_back_to_host() {
    let app = app();
    assert_eq!(app.title, "vocab.example.com");
  }

  #[tokio::test]
  async fn test_view_then_pop_back_to_root() {
    let mut app = app();
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.tick();

    app.handle_key(key(KeyCode::Char('v')));
    assert_eq!(app.breadcrumb(), vec!["Words", "docker"]);

    app.handle_key(key(KeyCode::Esc));
    assert_eq!(app.breadcrumb(), vec!["Words"]);

    // Pop at the root is ignored
    app.handle_key(key(KeyCode::Char('q')));
    assert_eq!(app.breadcrumb(), vec!["Words"]);
    assert!(!app.should_quit);
  }

  #[tokio::test]
  async fn test_words_command_resets_stack() {
    let mut app = app();
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.tick();
    app.handle_key(key(KeyCode::Char('v')));

    type_command(&mut app, "words");
    assert_eq!(app.breadcrumb(), vec!["Words"]);
  }

  #[tokio::test]
  async fn test_quit_command_and_ctrl_c() {
    let mut app = app();
    type_command(&mut app, "quit");
    assert!(app.should_quit);

    let mut app = self::app();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_unknown_command_posts_error_toast() {
    let mut app = app();
    type_command(&mut app, "bogus");
    app.tick();
    let messages: Vec<_> = app
      .notifications
      .visible()
      .map(|n| n.message.clone())
      .collect();
    assert_eq!(messages, vec!["Unknown command: bogus".to_string()]);
  }

  #[tokio::test]
  async fn test_colon_is_plain_text_while_form_is_open() {
    let mut app = app();
    tokio::time::sleep(Duration::from_millis(10)).await;
    app.tick();

    app.handle_key(key(KeyCode::Char('n')));
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command_input.is_active());
  }

  #[tokio::test]
  async fn test_draws_header_and_footer() {
    let mut app = app();
    let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
    terminal.draw(|frame| app.draw(frame)).unwrap();

    let buffer = terminal.backend().buffer();
    let row = |y: u16| {
      (0..buffer.area.width)
        .map(|x| buffer[(x, y)].symbol())
        .collect::<String>()
    };
    assert!(row(0).contains("vocab.example.com"));
    assert!(row(19).contains("Words"));
  }
}
