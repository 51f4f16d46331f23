//! Error type for `macrocoach-session`.

use macrocoach_core::AsCoreError;
use macrocoach_mealgen::GenerationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
  /// A domain rejection the user can act on.
  #[error(transparent)]
  Core(#[from] macrocoach_core::Error),

  /// A domain rejection raised inside the store.
  #[error("{0}")]
  Rejected(String),

  #[error("meal generation failed: {0}")]
  Generation(GenerationError),

  #[error("store error: {0}")]
  Store(Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
  /// Keep domain rejections from the store visible to the user; anything else
  /// is an internal failure.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    match e.as_core() {
      Some(core) if !matches!(core, macrocoach_core::Error::Serialization(_)) => {
        Self::Rejected(core.to_string())
      }
      _ => Self::Store(Box::new(e)),
    }
  }

  /// Whether the reply should carry the error text rather than an apology.
  pub fn is_user_facing(&self) -> bool {
    match self {
      Self::Core(e) => !matches!(e, macrocoach_core::Error::Serialization(_)),
      Self::Rejected(_) => true,
      Self::Generation(_) | Self::Store(_) => false,
    }
  }
}

impl From<GenerationError> for SessionError {
  fn from(e: GenerationError) -> Self {
    match e {
      GenerationError::Validation(core) => Self::Core(core),
      other => Self::Generation(other),
    }
  }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
