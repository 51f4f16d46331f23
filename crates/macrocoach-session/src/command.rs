//! Chat command vocabulary and its parser.

use strum::IntoStaticStr;

/// A parsed chat message. Arguments are kept as raw tokens; the
/// [`payload`](crate::payload) parsers turn them into domain values.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
  /// `/status`
  Status,
  /// `/plan [cuisine ...]`
  Plan { cuisines: Vec<String> },
  /// `/add key=value ...`
  Add { args: Vec<String> },
  /// `/swap <meal_id>`
  Swap { meal_id: String },
  /// `/accept <meal_id>`
  Accept { meal_id: String },
  /// `/profile [key=value ...]`
  Profile { args: Vec<String> },
  /// `/help`
  Help,
  /// A slash command nobody knows.
  Unknown { name: String },
  /// Anything that does not start with `/`.
  Text,
}

impl Command {
  /// Parse one message. Never fails: unrecognised input becomes
  /// [`Command::Unknown`] or [`Command::Text`].
  pub fn parse(message: &str) -> Self {
    let message = message.trim();
    let Some(rest) = message.strip_prefix('/') else {
      return Self::Text;
    };

    let (name, tail) = rest
      .split_once(char::is_whitespace)
      .unwrap_or((rest, ""));
    let args = tokens(tail);

    match name.to_ascii_lowercase().as_str() {
      "status" => Self::Status,
      "plan" => Self::Plan { cuisines: args.into_iter().map(|c| c.to_lowercase()).collect() },
      "add" | "log" => Self::Add { args },
      "swap" => match args.into_iter().next() {
        Some(meal_id) => Self::Swap { meal_id },
        None => Self::Unknown { name: "swap".into() },
      },
      "accept" => match args.into_iter().next() {
        Some(meal_id) => Self::Accept { meal_id },
        None => Self::Unknown { name: "accept".into() },
      },
      "profile" => Self::Profile { args },
      "help" | "start" => Self::Help,
      _ => Self::Unknown { name: name.to_owned() },
    }
  }

  /// Short tag stored with the chat turn, e.g. `"status"`.
  pub fn tag(&self) -> &'static str { self.into() }
}

/// Split arguments on whitespace and commas, dropping empty pieces.
fn tokens(s: &str) -> Vec<String> {
  s.split(|c: char| c.is_whitespace() || c == ',')
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_commands() {
    assert_eq!(Command::parse("/status"), Command::Status);
    assert_eq!(Command::parse("  /STATUS  "), Command::Status);
    assert_eq!(Command::parse("/help"), Command::Help);
    assert_eq!(
      Command::parse("/plan Turkish italian"),
      Command::Plan { cuisines: vec!["turkish".into(), "italian".into()] }
    );
    assert_eq!(Command::parse("/plan"), Command::Plan { cuisines: vec![] });
  }

  #[test]
  fn add_arguments_split_on_commas_and_spaces() {
    assert_eq!(
      Command::parse("/add weight=72.5, steps=8000  hr=61"),
      Command::Add { args: vec!["weight=72.5".into(), "steps=8000".into(), "hr=61".into()] }
    );
  }

  #[test]
  fn swap_needs_an_id() {
    let id = "5b0c3c4e-4a0e-4b7e-9a43-0f1c2d3e4f50";
    assert_eq!(
      Command::parse(&format!("/swap {id}")),
      Command::Swap { meal_id: id.into() }
    );
    assert_eq!(Command::parse("/swap"), Command::Unknown { name: "swap".into() });
  }

  #[test]
  fn free_text_and_unknown_commands() {
    assert_eq!(Command::parse("how am I doing?"), Command::Text);
    assert_eq!(Command::parse(""), Command::Text);
    assert_eq!(Command::parse("/dance now"), Command::Unknown { name: "dance".into() });
  }

  #[test]
  fn tags() {
    assert_eq!(Command::Status.tag(), "status");
    assert_eq!(Command::Add { args: vec![] }.tag(), "add");
    assert_eq!(Command::Unknown { name: "x".into() }.tag(), "unknown");
    assert_eq!(Command::Text.tag(), "text");
  }
}
