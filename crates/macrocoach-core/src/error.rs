//! Error types for `macrocoach-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::meal::MealStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed or out-of-range input. Rejected before anything is persisted.
  #[error("invalid {field}: {reason}")]
  Validation { field: &'static str, reason: String },

  #[error("no profile for user {0:?}")]
  ProfileNotFound(String),

  #[error("meal not found: {0}")]
  MealNotFound(Uuid),

  #[error("meal {0} is already {1}")]
  MealAlreadyTransitioned(Uuid, MealStatus),

  #[error("a meal cannot be moved back to {0}")]
  InvalidTransition(MealStatus),

  #[error("unknown {kind}: {value:?}")]
  UnknownVariant { kind: &'static str, value: String },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
    Self::Validation { field, reason: reason.into() }
  }

  pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
    Self::UnknownVariant { kind, value: value.into() }
  }

  pub fn is_validation(&self) -> bool { matches!(self, Self::Validation { .. }) }
}

/// Lets callers that only know a backend through [`CoachStore`] tell domain
/// failures (validation, not found, conflicting transition) apart from I/O.
///
/// [`CoachStore`]: crate::store::CoachStore
pub trait AsCoreError {
  fn as_core(&self) -> Option<&Error>;
}

impl AsCoreError for Error {
  fn as_core(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
