use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Key hint shown in the header, sorted by `priority` (lowest first)
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Stack change requested by a view
pub enum ViewAction {
  None,
  Push(Box<dyn View>),
  /// Back to the previous view; ignored at the root
  Pop,
}

/// A screen on the app's view stack.
///
/// The app routes keys to the top view only, but ticks every view so queries
/// further down the stack keep their snapshots current. Overlays (forms,
/// dialogs, filters) live inside the view that opened them.
pub trait View {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Footer breadcrumb segment
  fn breadcrumb_label(&self) -> String;

  /// Poll queries, mutations and overlay timers
  fn tick(&mut self) {}

  /// `:refresh`
  fn refresh(&mut self) {}

  /// While true the app keeps `:` and other global keys away from the view
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Data freshness badge for the header, e.g. "offline"
  fn status_badge(&self) -> Option<(&'static str, Color)> {
    None
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
