//! Handlers for the chat endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/chat` | Body: `{"user_id":"...","message":"..."}`; returns `{"reply":"..."}` |
//! | `GET`  | `/users/:id/turns` | Recent turns, newest first; `?limit=` (default 20) |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use macrocoach_core::{generate::MealGenerator, store::CoachStore, turn::ChatTurn};
use macrocoach_session::CoachSession;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

const DEFAULT_TURNS: usize = 20;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
  pub user_id: String,
  pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
  pub reply: String,
}

/// `POST /chat`
pub async fn send<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Json(body): Json<ChatBody>,
) -> Result<Json<ChatReply>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let user_id = body.user_id.trim();
  if user_id.is_empty() {
    return Err(ApiError::BadRequest("user_id must not be empty".into()));
  }
  let reply = session.handle_turn(user_id, &body.message).await;
  Ok(Json(ChatReply { reply }))
}

#[derive(Debug, Deserialize)]
pub struct TurnParams {
  pub limit: Option<usize>,
}

/// `GET /users/:id/turns[?limit=N]`
pub async fn turns<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Query(params): Query<TurnParams>,
) -> Result<Json<Vec<ChatTurn>>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let turns = session
    .store()
    .recent_turns(&user_id, params.limit.unwrap_or(DEFAULT_TURNS))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(turns))
}
