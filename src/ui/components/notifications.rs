//! Transient toast messages.
//!
//! Anything holding a `Notifier` can post; the app drains the channel on tick
//! and drops toasts once they outlive their time to live.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Toasts kept on screen at once; older ones are dropped first
const MAX_VISIBLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
  pub kind: NotificationKind,
  pub message: String,
  posted_at: Instant,
}

/// Posting side, cheap to clone into views and components
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  pub fn success(&self, message: impl Into<String>) {
    self.post(NotificationKind::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.post(NotificationKind::Error, message.into());
  }

  fn post(&self, kind: NotificationKind, message: String) {
    match kind {
      NotificationKind::Success => info!(%message, "notification"),
      NotificationKind::Error => warn!(%message, "notification"),
    }
    // The app owns the receiver for the whole session
    let _ = self.tx.send(Notification {
      kind,
      message,
      posted_at: Instant::now(),
    });
  }
}

/// Receiving side, owned by the app
#[derive(Debug)]
pub struct Notifications {
  rx: mpsc::UnboundedReceiver<Notification>,
  visible: VecDeque<Notification>,
  ttl: Duration,
}

impl Notifications {
  pub fn channel(ttl: Duration) -> (Notifier, Self) {
    let (tx, rx) = mpsc::unbounded_channel();
    let notifications = Self {
      rx,
      visible: VecDeque::new(),
      ttl,
    };
    (Notifier { tx }, notifications)
  }

  /// Pull posted toasts and expire old ones. Returns `true` if anything changed.
  pub fn tick(&mut self) -> bool {
    let mut changed = false;
    while let Ok(notification) = self.rx.try_recv() {
      self.visible.push_back(notification);
      changed = true;
    }
    while self.visible.len() > MAX_VISIBLE {
      self.visible.pop_front();
    }

    let before = self.visible.len();
    let ttl = self.ttl;
    self.visible.retain(|n| n.posted_at.elapsed() < ttl);
    changed || self.visible.len() != before
  }

  pub fn visible(&self) -> impl Iterator<Item = &Notification> {
    self.visible.iter()
  }

  /// Stack toasts in the bottom-right corner of `area`, newest at the bottom
  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 40.min(area.width);
    let mut bottom = area.y + area.height;

    for notification in self.visible.iter().rev() {
      if bottom < area.y + 3 {
        break;
      }
      let rect = Rect::new(area.x + area.width - width, bottom - 3, width, 3);
      bottom -= 3;

      let color = match notification.kind {
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
      };
      frame.render_widget(Clear, rect);
      frame.render_widget(
        Paragraph::new(notification.message.as_str())
          .wrap(Wrap { trim: true })
          .block(
            Block::default()
              .borders(Borders::ALL)
              .border_style(Style::default().fg(color)),
          ),
        rect,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_posted_toasts_show_after_tick() {
    let (notifier, mut notifications) = Notifications::channel(Duration::from_secs(5));
    notifier.success("Word created successfully");
    notifier.error("Failed to delete word");
    assert_eq!(notifications.visible().count(), 0);

    assert!(notifications.tick());
    let shown: Vec<_> = notifications
      .visible()
      .map(|n| (n.kind, n.message.as_str()))
      .collect();
    assert_eq!(
      shown,
      vec![
        (NotificationKind::Success, "Word created successfully"),
        (NotificationKind::Error, "Failed to delete word"),
      ]
    );
    assert!(!notifications.tick());
  }

  #[test]
  fn test_toasts_expire() {
    let (notifier, mut notifications) = Notifications::channel(Duration::ZERO);
    notifier.success("gone");
    notifications.tick();
    assert_eq!(notifications.visible().count(), 0);
  }

  #[test]
  fn test_oldest_dropped_beyond_limit() {
    let (notifier, mut notifications) = Notifications::channel(Duration::from_secs(5));
    for i in 0..6 {
      notifier.success(format!("n{i}"));
    }
    notifications.tick();
    let first = notifications.visible().next().unwrap();
    assert_eq!(first.message, "n2");
  }
}
