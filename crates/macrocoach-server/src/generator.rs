//! The generator the server runs with, picked from configuration.

use macrocoach_core::generate::{GenerationRequest, MealCandidate, MealGenerator};
use macrocoach_mealgen::{GenerationError, OpenAiGenerator, PantryGenerator};

pub enum Generator {
  Pantry(PantryGenerator),
  OpenAi(OpenAiGenerator),
}

impl MealGenerator for Generator {
  type Error = GenerationError;

  fn name(&self) -> &str {
    match self {
      Generator::Pantry(g) => g.name(),
      Generator::OpenAi(g) => g.name(),
    }
  }

  async fn generate(
    &self,
    request: &GenerationRequest,
  ) -> Result<Vec<MealCandidate>, GenerationError> {
    match self {
      Generator::Pantry(g) => Ok(g.candidates(request)),
      Generator::OpenAi(g) => g.generate(request).await,
    }
  }
}
