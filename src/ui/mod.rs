pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::widgets::TableState;

/// Keep the selection inside `0..len`, selecting the first row when nothing is selected
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  let selected = match (state.selected(), len) {
    (_, 0) => None,
    (None, _) => Some(0),
    (Some(i), len) => Some(i.min(len - 1)),
  };
  state.select(selected);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
