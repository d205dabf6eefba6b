//! `:` commands and their autocomplete ranking.

/// What a command does once submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  /// Back to the word list, dropping any pushed views
  Words,
  /// Refetch whatever the current view shows
  Refresh,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "words",
    aliases: &["w", "word", "list"],
    description: "Browse vocabulary words",
    action: CommandAction::Words,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch the words list",
    action: CommandAction::Refresh,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit lexis",
    action: CommandAction::Quit,
  },
];

/// How well `cmd` matches `input`; lower is better, `None` is no match.
///
/// Exact beats prefix beats substring, and the name beats its aliases at
/// each level.
fn rank(cmd: &Command, input: &str) -> Option<u8> {
  fn exact(candidate: &str, input: &str) -> bool {
    candidate == input
  }
  fn prefix(candidate: &str, input: &str) -> bool {
    candidate.starts_with(input)
  }
  fn substring(candidate: &str, input: &str) -> bool {
    candidate.contains(input)
  }

  let tests: [fn(&str, &str) -> bool; 3] = [exact, prefix, substring];
  tests.iter().enumerate().find_map(|(level, test)| {
    let level = level as u8 * 2;
    if test(cmd.name, input) {
      Some(level)
    } else if cmd.aliases.iter().any(|alias| test(alias, input)) {
      Some(level + 1)
    } else {
      None
    }
  })
}

/// Commands matching `input`, best first. Empty input lists every command.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();
  let mut ranked: Vec<(u8, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|r| (r, cmd)))
    .collect();
  // Stable, so equal ranks keep declaration order
  ranked.sort_by_key(|(r, _)| *r);
  ranked.into_iter().map(|(_, cmd)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[rstest]
  #[case::exact("words", CommandAction::Words)]
  #[case::alias("w", CommandAction::Words)]
  #[case::prefix("wor", CommandAction::Words)]
  #[case::fuzzy("ord", CommandAction::Words)]
  #[case::alias_prefix("rel", CommandAction::Refresh)]
  #[case::quit_alias("q", CommandAction::Quit)]
  #[case::padded(" exit ", CommandAction::Quit)]
  fn test_best_suggestion(#[case] input: &str, #[case] expected: CommandAction) {
    let suggestions = get_suggestions(input);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].action, expected);
  }

  #[test]
  fn test_name_prefix_beats_alias_prefix() {
    // "re" prefixes the name "refresh" and the alias "reload"
    assert_eq!(rank(&COMMANDS[1], "re"), Some(2));
    assert_eq!(rank(&COMMANDS[1], "rel"), Some(3));
  }

  #[test]
  fn test_case_insensitive() {
    assert_eq!(get_suggestions("REFRESH")[0].name, "refresh");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
