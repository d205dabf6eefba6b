use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::ShortcutInfo;

/// Draw the header bar with title, API host, an optional status badge and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  host: &str,
  badge: Option<(&str, Color)>,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(" lexis ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Yellow).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
  ];

  if let Some((label, color)) = badge {
    spans.push(Span::styled(format!("[{label}]"), Style::default().fg(color)));
  }

  spans.push(Span::raw("  "));

  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for (i, shortcut) in sorted.into_iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
  use super::*;
  use ratatui::backend::TestBackend;
  use ratatui::Terminal;

  #[test]
  fn test_header_orders_shortcuts_by_priority() {
    let backend = TestBackend::new(100, 1);
    let mut terminal = Terminal::new(backend).unwrap();
    let shortcuts = [
      ShortcutInfo::new("q", "back").with_priority(30),
      ShortcutInfo::new(":", "command").with_priority(10),
    ];

    terminal
      .draw(|f| {
        draw_header(
          f,
          f.area(),
          "Vocabulary",
          "vocab.example.com",
          Some(("offline", Color::Red)),
          &shortcuts,
        )
      })
      .unwrap();

    let line: String = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|c| c.symbol())
      .collect();
    assert!(line.contains("Vocabulary"));
    assert!(line.contains("vocab.example.com"));
    assert!(line.contains("[offline]"));
    assert!(line.find("<:>").unwrap() < line.find("<q>").unwrap());
  }
}
