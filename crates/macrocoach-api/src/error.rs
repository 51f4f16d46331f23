//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use macrocoach_core::AsCoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  Unprocessable(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a store error, keeping the status of domain rejections.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    e.as_core()
      .and_then(Self::from_core)
      .unwrap_or_else(|| Self::Store(Box::new(e)))
  }

  /// `None` for core errors that are internal failures.
  pub fn from_core(e: &macrocoach_core::Error) -> Option<Self> {
    use macrocoach_core::Error as E;
    let msg = e.to_string();
    match e {
      E::Validation { .. } | E::UnknownVariant { .. } => Some(Self::Unprocessable(msg)),
      E::ProfileNotFound(_) | E::MealNotFound(_) => Some(Self::NotFound(msg)),
      E::MealAlreadyTransitioned(..) | E::InvalidTransition(_) => Some(Self::Conflict(msg)),
      E::Serialization(_) => None,
    }
  }
}

impl From<macrocoach_core::Error> for ApiError {
  fn from(e: macrocoach_core::Error) -> Self {
    Self::from_core(&e).unwrap_or_else(|| Self::Store(Box::new(e)))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
