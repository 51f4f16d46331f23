//! Handlers for targets and meal plans.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:id/targets` | Newest first; `?limit=` (default 30) |
//! | `GET`  | `/users/:id/meals` | `?date=YYYY-MM-DD` (default today, UTC); swapped meals included |
//! | `GET`  | `/meals/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{NaiveDate, Utc};
use macrocoach_core::{
  generate::MealGenerator,
  meal::MealSuggestion,
  store::{CoachStore, StoredTarget},
};
use macrocoach_session::CoachSession;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

const DEFAULT_TARGETS: usize = 30;

// ─── Targets ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TargetParams {
  pub limit: Option<usize>,
}

/// `GET /users/:id/targets[?limit=N]`
pub async fn targets<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Query(params): Query<TargetParams>,
) -> Result<Json<Vec<StoredTarget>>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let targets = session
    .store()
    .target_history(&user_id, params.limit.unwrap_or(DEFAULT_TARGETS))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(targets))
}

// ─── Meals ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MealParams {
  pub date: Option<NaiveDate>,
}

/// `GET /users/:id/meals[?date=YYYY-MM-DD]`
pub async fn meals<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Query(params): Query<MealParams>,
) -> Result<Json<Vec<MealSuggestion>>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
  let meals = session
    .store()
    .list_meals(&user_id, date)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(meals))
}

/// `GET /meals/:id`
pub async fn meal<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<MealSuggestion>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let meal = session
    .store()
    .get_meal(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("meal {id} not found")))?;
  Ok(Json(meal))
}
