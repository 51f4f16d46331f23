//! MacroCoach HTTP server.
//!
//! Assembles the JSON API from `macrocoach-api` behind optional HTTP Basic
//! auth, adds an unauthenticated health check, and wires the configured
//! store, planner and meal generator into a [`CoachSession`].

pub mod auth;
pub mod generator;
pub mod seed;

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, middleware, routing::get};
use macrocoach_core::{
  generate::MealGenerator,
  planner::{EnergyPlanner, PlannerConfig},
  store::CoachStore,
};
use macrocoach_mealgen::{
  GenerationError, MealServiceConfig, MealSuggestionService, OpenAiConfig, OpenAiGenerator,
  PantryGenerator,
};
use macrocoach_session::{CoachSession, SessionConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use generator::Generator;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MACROCOACH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_store_path")]
  pub store_path:         PathBuf,
  pub auth_username:      Option<String>,
  pub auth_password_hash: Option<String>,
  #[serde(default)]
  pub planner:            PlannerConfig,
  #[serde(default)]
  pub meals:              MealsSection,
  #[serde(default)]
  pub session:            SessionSection,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("macrocoach.db") }

/// `[meals]`: the suggestion policy plus the optional LLM endpoint.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MealsSection {
  pub meals_per_day:   usize,
  pub tolerance:       f64,
  pub max_retries:     u32,
  pub timeout_secs:    u64,
  /// When set, meals come from this OpenAI-compatible endpoint; otherwise
  /// the offline pantry generator is used.
  pub llm_base_url:    Option<String>,
  pub llm_model:       Option<String>,
  pub llm_api_key:     Option<String>,
  pub default_cuisine: Option<String>,
}

impl Default for MealsSection {
  fn default() -> Self {
    let service = MealServiceConfig::default();
    Self {
      meals_per_day:   service.meals_per_day,
      tolerance:       service.tolerance,
      max_retries:     service.max_retries,
      timeout_secs:    service.timeout_secs,
      llm_base_url:    None,
      llm_model:       None,
      llm_api_key:     None,
      default_cuisine: None,
    }
  }
}

/// `[session]`: chat behaviour. The default cuisine belongs to `[meals]`.
#[derive(Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
  pub window_days: u32,
}

impl Default for SessionSection {
  fn default() -> Self { Self { window_days: SessionConfig::default().window_days } }
}

impl MealsSection {
  pub fn service(&self) -> MealServiceConfig {
    MealServiceConfig {
      meals_per_day: self.meals_per_day,
      tolerance:     self.tolerance,
      max_retries:   self.max_retries,
      timeout_secs:  self.timeout_secs,
    }
  }

  pub fn generator(&self) -> Result<Generator, GenerationError> {
    let Some(base_url) = &self.llm_base_url else {
      return Ok(Generator::Pantry(PantryGenerator::new()));
    };
    let mut config = OpenAiConfig {
      base_url: base_url.clone(),
      api_key: self.llm_api_key.clone(),
      timeout: self.service().timeout(),
      ..OpenAiConfig::default()
    };
    if let Some(model) = &self.llm_model {
      config.model = model.clone();
    }
    Ok(Generator::OpenAi(OpenAiGenerator::new(config)?))
  }
}

impl ServerConfig {
  /// `None` when no username is configured; the API is then open.
  pub fn auth(&self) -> Option<AuthConfig> {
    let username = self.auth_username.clone()?;
    Some(AuthConfig {
      username,
      password_hash: self.auth_password_hash.clone().unwrap_or_default(),
    })
  }

  pub fn session(&self) -> SessionConfig {
    SessionConfig {
      window_days:     self.session.window_days,
      default_cuisine: self.meals.default_cuisine.clone(),
    }
  }
}

/// Wire `store` and `generator` into a session configured by `config`.
pub fn build_session<S, G>(
  config: &ServerConfig,
  store: Arc<S>,
  generator: G,
) -> CoachSession<S, G>
where
  S: CoachStore,
  G: MealGenerator,
{
  CoachSession::new(
    store,
    EnergyPlanner::new(config.planner.clone()),
    MealSuggestionService::new(generator, config.meals.service()),
    config.session(),
  )
}

// ─── Application state ────────────────────────────────────────────────────────

pub struct AppState<S, G> {
  pub session: Arc<CoachSession<S, G>>,
  pub auth:    Option<Arc<AuthConfig>>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// `GET /health` plus the JSON API under `/api`.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  let mut api = macrocoach_api::api_router(state.session);
  if let Some(auth) = state.auth {
    api = api.route_layer(middleware::from_fn_with_state(auth, auth::require_auth));
  }

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }
