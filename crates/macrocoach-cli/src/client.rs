//! Async HTTP client wrapping the MacroCoach JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use macrocoach_core::{
  meal::MealSuggestion,
  metric::{MetricSample, NewMetric},
};
use macrocoach_session::StatusReport;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

/// Samples per `POST /metrics` request during an import.
const IMPORT_BATCH: usize = 500;

/// Connection settings for the MacroCoach API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

#[derive(Serialize)]
struct ChatBody<'a> {
  user_id: &'a str,
  message: &'a str,
}

#[derive(Deserialize)]
struct ChatReply {
  reply: String,
}

/// Async HTTP client for the MacroCoach JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    // Meal generation can take the server's full generator timeout.
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Turn a non-2xx response into an error carrying the server's message.
  async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v["error"].as_str().map(str::to_owned))
      .unwrap_or_default();
    Err(anyhow!("{what} → {status} {message}"))
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  /// `POST /api/chat`
  pub async fn chat(&self, user_id: &str, message: &str) -> Result<String> {
    let resp = self
      .auth(self.client.post(self.url("/chat")))
      .json(&ChatBody { user_id, message })
      .send()
      .await
      .context("POST /chat failed")?;
    let reply: ChatReply = Self::check(resp, "POST /chat")
      .await?
      .json()
      .await
      .context("deserialising chat reply")?;
    Ok(reply.reply)
  }

  // ── Dashboard ─────────────────────────────────────────────────────────────

  /// `GET /api/users/<id>/status`
  pub async fn status(&self, user_id: &str) -> Result<StatusReport> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/users/{user_id}/status"))))
      .send()
      .await
      .context("GET /status failed")?;
    Self::check(resp, "GET /status")
      .await?
      .json()
      .await
      .context("deserialising status")
  }

  /// `GET /api/users/<id>/meals?date=<date>`
  pub async fn meals(&self, user_id: &str, date: NaiveDate) -> Result<Vec<MealSuggestion>> {
    let resp = self
      .auth(self.client.get(self.url(&format!("/users/{user_id}/meals"))))
      .query(&[("date", date.format("%Y-%m-%d").to_string())])
      .send()
      .await
      .context("GET /meals failed")?;
    Self::check(resp, "GET /meals")
      .await?
      .json()
      .await
      .context("deserialising meals")
  }

  // ── Import ────────────────────────────────────────────────────────────────

  /// `POST /api/users/<id>/metrics`, in batches. Returns the number stored.
  pub async fn upload_metrics(&self, user_id: &str, metrics: &[NewMetric]) -> Result<usize> {
    let mut stored = 0;
    for batch in metrics.chunks(IMPORT_BATCH) {
      let resp = self
        .auth(self.client.post(self.url(&format!("/users/{user_id}/metrics"))))
        .json(batch)
        .send()
        .await
        .context("POST /metrics failed")?;
      let saved: Vec<MetricSample> = Self::check(resp, "POST /metrics")
        .await?
        .json()
        .await
        .context("deserialising stored samples")?;
      stored += saved.len();
    }
    Ok(stored)
  }
}
