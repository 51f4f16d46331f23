//! Error type for `macrocoach-mealgen`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
  #[error("generation timed out after {0:?}")]
  Timeout(Duration),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("generator returned {status}: {body}")]
  Status { status: u16, body: String },

  #[error("malformed generator output: {0}")]
  Malformed(String),

  #[error(transparent)]
  Validation(#[from] macrocoach_core::Error),
}

pub type Result<T, E = GenerationError> = std::result::Result<T, E>;
