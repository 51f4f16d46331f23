//! Handlers for per-user profile and status endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:id/status` | Profile, latest target and progress; `?as_of=` (RFC 3339) |
//! | `GET`  | `/users/:id/profile` | 404 before onboarding |
//! | `PUT`  | `/users/:id/profile` | Saves a new version; 422 on invalid fields |
//! | `GET`  | `/users/:id/profile/history` | Every version, newest first |

use std::{collections::BTreeSet, sync::Arc};

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use macrocoach_core::{
  generate::MealGenerator,
  profile::{ActivityLevel, Goal, NewProfile, Sex, UserProfile},
  store::CoachStore,
};
use macrocoach_session::{CoachSession, SessionError, StatusReport};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StatusParams {
  pub as_of: Option<DateTime<Utc>>,
}

/// `GET /users/:id/status[?as_of=<rfc3339>]`
pub async fn status<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Query(params): Query<StatusParams>,
) -> Result<Json<StatusReport>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let as_of = params.as_of.unwrap_or_else(Utc::now);
  let report = session.status_report(&user_id, as_of).await.map_err(from_session)?;
  Ok(Json(report))
}

/// Status reads only touch the store, so anything else is a 500.
fn from_session(e: SessionError) -> ApiError {
  match e {
    SessionError::Core(core) => core.into(),
    SessionError::Rejected(msg) => ApiError::Unprocessable(msg),
    other => ApiError::Store(Box::new(other)),
  }
}

// ─── Profile ──────────────────────────────────────────────────────────────────

/// `GET /users/:id/profile`
pub async fn profile<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let profile = session
    .store()
    .get_profile(&user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no profile for user {user_id}")))?;
  Ok(Json(profile))
}

/// A profile without its owner; the owner comes from the path.
#[derive(Debug, Deserialize)]
pub struct ProfileBody {
  pub sex:                 Sex,
  pub age:                 u32,
  pub height_cm:           f64,
  pub weight_kg:           f64,
  pub activity_level:      ActivityLevel,
  pub goal:                Goal,
  #[serde(default)]
  pub dietary_preferences: BTreeSet<String>,
}

/// `PUT /users/:id/profile`
pub async fn save_profile<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Json(body): Json<ProfileBody>,
) -> Result<Json<UserProfile>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let input = NewProfile {
    user_id,
    sex: body.sex,
    age: body.age,
    height_cm: body.height_cm,
    weight_kg: body.weight_kg,
    activity_level: body.activity_level,
    goal: body.goal,
    dietary_preferences: body.dietary_preferences,
  };
  input.validate()?;
  let saved = session.store().save_profile(input).await.map_err(ApiError::store)?;
  tracing::info!(user_id = %saved.user_id, version = saved.version, "profile saved via api");
  Ok(Json(saved))
}

// ─── History ──────────────────────────────────────────────────────────────────

/// `GET /users/:id/profile/history`
pub async fn history<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
) -> Result<Json<Vec<UserProfile>>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let versions = session
    .store()
    .profile_history(&user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(versions))
}
