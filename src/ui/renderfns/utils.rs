use chrono::{DateTime, Utc};
use ratatui::prelude::{Color, Rect};

use crate::cache::CacheSource;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
  }
}

/// Calendar date as shown in tables, e.g. "Mar 14, 2025"
pub fn format_date(at: &DateTime<Utc>) -> String {
  at.format("%b %d, %Y").to_string()
}

/// Header badge describing where the shown data came from, if worth mentioning
pub fn source_badge(source: CacheSource, fetching: bool) -> Option<(&'static str, Color)> {
  match (source, fetching) {
    (_, true) => Some(("refreshing", Color::Yellow)),
    (CacheSource::Offline, false) => Some(("offline", Color::Red)),
    (CacheSource::Persisted, false) => Some(("cached", Color::Magenta)),
    _ => None,
  }
}

/// A `width` x `height` rectangle centered in `area`, clipped to it
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("منصة جوجل السحابية", 7), "منصة...");
  }

  #[test]
  fn test_format_date_pads_day() {
    let at = Utc.with_ymd_and_hms(2025, 3, 4, 23, 59, 0).unwrap();
    assert_eq!(format_date(&at), "Mar 04, 2025");
  }

  #[test]
  fn test_centered_clips_to_area() {
    let area = Rect::new(0, 0, 20, 10);
    assert_eq!(centered(area, 10, 4), Rect::new(5, 3, 10, 4));
    assert_eq!(centered(area, 50, 50), area);
  }

  #[test]
  fn test_source_badge() {
    assert_eq!(source_badge(CacheSource::Network, false), None);
    assert_eq!(
      source_badge(CacheSource::Offline, false),
      Some(("offline", Color::Red))
    );
    assert_eq!(
      source_badge(CacheSource::Network, true),
      Some(("refreshing", Color::Yellow))
    );
  }
}
