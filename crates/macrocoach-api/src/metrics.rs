//! Handlers for `/users/:id/metrics`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users/:id/metrics` | `?window_days=` (default from session config), `?as_of=` (RFC 3339) |
//! | `POST` | `/users/:id/metrics` | One sample or an array; all are validated before any is written |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use macrocoach_core::{
  generate::MealGenerator,
  metric::{Measurements, MetricSample, NewMetric},
  store::CoachStore,
};
use macrocoach_session::CoachSession;
use serde::Deserialize;

use crate::error::ApiError;

const API_SOURCE: &str = "api";

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub window_days: Option<u32>,
  pub as_of:       Option<DateTime<Utc>>,
}

/// `GET /users/:id/metrics[?window_days=N&as_of=<rfc3339>]`
pub async fn list<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<MetricSample>>, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let window = params.window_days.unwrap_or(session.config().window_days);
  let as_of = params.as_of.unwrap_or_else(Utc::now);
  let samples = session
    .store()
    .get_latest_metrics(&user_id, window, as_of)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(samples))
}

// ─── Ingest ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MetricBody {
  pub timestamp: DateTime<Utc>,
  pub source:    Option<String>,
  #[serde(flatten)]
  pub values:    Measurements,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestBody {
  Many(Vec<MetricBody>),
  One(MetricBody),
}

impl IngestBody {
  fn into_metrics(self, user_id: &str) -> Vec<NewMetric> {
    let bodies = match self {
      IngestBody::Many(v) => v,
      IngestBody::One(b) => vec![b],
    };
    bodies
      .into_iter()
      .map(|b| NewMetric {
        user_id:   user_id.to_owned(),
        timestamp: b.timestamp,
        source:    Some(b.source.unwrap_or_else(|| API_SOURCE.to_owned())),
        values:    b.values,
      })
      .collect()
  }
}

/// `POST /users/:id/metrics`
pub async fn ingest<S, G>(
  State(session): State<Arc<CoachSession<S, G>>>,
  Path(user_id): Path<String>,
  Json(body): Json<IngestBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let metrics = body.into_metrics(&user_id);
  if metrics.is_empty() {
    return Err(ApiError::BadRequest("no samples in body".into()));
  }
  for m in &metrics {
    m.validate()?;
  }

  let mut saved = Vec::with_capacity(metrics.len());
  for m in metrics {
    saved.push(session.store().save_metric(m).await.map_err(ApiError::store)?);
  }
  tracing::info!(user_id, count = saved.len(), "metrics ingested");
  Ok((StatusCode::CREATED, Json(saved)))
}
