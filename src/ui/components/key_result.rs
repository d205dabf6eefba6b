/// What an overlay did with a key.
///
/// Views walk their overlays in order and stop at the first one that
/// consumed the key, so only `NotHandled` lets a key reach the view itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the view to do
  Handled,
  /// Consumed, and the view should react to `T`
  Event(T),
  /// Not consumed, try the next handler
  NotHandled,
}

impl<T> KeyResult<T> {
  /// True unless the key should fall through to the next handler
  pub fn is_consumed(&self) -> bool {
    !matches!(self, KeyResult::NotHandled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_only_not_handled_falls_through() {
    assert!(KeyResult::<()>::Handled.is_consumed());
    assert!(KeyResult::Event(1).is_consumed());
    assert!(!KeyResult::<()>::NotHandled.is_consumed());
  }
}
