//! Meal suggestions for MacroCoach.
//!
//! [`MealSuggestionService`] wraps any [`MealGenerator`] with the policy the
//! rest of the system relies on: every candidate is checked against the macro
//! envelope, missing slots are regenerated a bounded number of times, each
//! call is bounded by a timeout, and the caller always gets exactly the
//! number of meals it asked for.
//!
//! Two generators ship with the crate: [`OpenAiGenerator`] for any
//! OpenAI-compatible chat-completions endpoint, and [`PantryGenerator`], an
//! offline generator over a built-in ingredient table that also serves as
//! the degraded fallback.
//!
//! [`MealGenerator`]: macrocoach_core::generate::MealGenerator

pub mod error;
pub mod openai;
pub mod pantry;
pub mod service;

pub use error::GenerationError;
pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use pantry::PantryGenerator;
pub use service::{MealRequest, MealServiceConfig, MealSuggestionService, request_digest};
