//! The `MealGenerator` trait: anything that can turn a macro envelope into
//! candidate meals.
//!
//! Implementations live in `macrocoach-mealgen` (an OpenAI-compatible HTTP
//! client and an offline pantry generator). The generator is not trusted: it
//! may return too few candidates, the wrong meal types or nutrition far from
//! the envelope. `MealSuggestionService` checks every candidate.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  meal::{Ingredient, MealType},
  target::Macros,
};

/// What a generator is asked for. Serialised canonically to compute the
/// request digest recorded in each suggestion's provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
  /// Macro envelope of a single meal.
  pub envelope:     Macros,
  /// One entry per requested meal.
  pub meal_types:   Vec<MealType>,
  pub cuisine_tags: Vec<String>,
  pub dietary_tags: Vec<String>,
  /// Meal names to steer away from, e.g. the meal being swapped out.
  #[serde(default)]
  pub avoid:        Vec<String>,
}

impl GenerationRequest {
  pub fn count(&self) -> usize { self.meal_types.len() }
}

/// An unvalidated meal as returned by a generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealCandidate {
  pub name:         String,
  pub meal_type:    MealType,
  pub macros:       Macros,
  #[serde(default)]
  pub cuisine:      Option<String>,
  #[serde(default)]
  pub ingredients:  Vec<Ingredient>,
  #[serde(default)]
  pub instructions: Vec<String>,
}

pub trait MealGenerator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Short identifier recorded in provenance, e.g. `"openai:gpt-4o-mini"`.
  fn name(&self) -> &str;

  fn generate<'a>(
    &'a self,
    request: &'a GenerationRequest,
  ) -> impl Future<Output = Result<Vec<MealCandidate>, Self::Error>> + Send + 'a;
}
