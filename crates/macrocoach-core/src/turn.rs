//! Chat history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTurn {
  pub user_id: String,
  pub message: String,
  pub reply:   String,
  /// Tag of the parsed command, e.g. `"status"` or `"text"`.
  pub command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
  pub turn_id:     Uuid,
  pub user_id:     String,
  pub message:     String,
  pub reply:       String,
  pub command:     String,
  pub recorded_at: DateTime<Utc>,
}
