//! JSON REST API for MacroCoach.
//!
//! Exposes an axum [`Router`] over a [`CoachSession`], which carries the
//! store, the planner and the meal service. Auth and TLS
//! are left to the caller.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", macrocoach_api::api_router(session.clone()))
//! ```

pub mod chat;
pub mod error;
pub mod metrics;
pub mod plans;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use macrocoach_core::{generate::MealGenerator, store::CoachStore};
use macrocoach_session::CoachSession;

pub use error::ApiError;

/// Build a fully-materialised API router for `session`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, G>(session: Arc<CoachSession<S, G>>) -> Router<()>
where
  S: CoachStore + 'static,
  G: MealGenerator + 'static,
{
  Router::new()
    // Chat
    .route("/chat", post(chat::send::<S, G>))
    .route("/users/{id}/turns", get(chat::turns::<S, G>))
    // Users
    .route("/users/{id}/status", get(users::status::<S, G>))
    .route("/users/{id}/profile", get(users::profile::<S, G>).put(users::save_profile::<S, G>))
    .route("/users/{id}/profile/history", get(users::history::<S, G>))
    // Metrics
    .route("/users/{id}/metrics", get(metrics::list::<S, G>).post(metrics::ingest::<S, G>))
    // Plans
    .route("/users/{id}/targets", get(plans::targets::<S, G>))
    .route("/users/{id}/meals", get(plans::meals::<S, G>))
    .route("/meals/{id}", get(plans::meal::<S, G>))
    .with_state(session)
}
