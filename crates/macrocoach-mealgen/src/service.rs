//! [`MealSuggestionService`]: validation, bounded regeneration, timeout and
//! degradation around a [`MealGenerator`].

use std::time::Duration;

use chrono::Utc;
use macrocoach_core::{
  generate::{GenerationRequest, MealCandidate, MealGenerator},
  meal::{MealStatus, MealSuggestion, MealType, Provenance},
  target::{MacroTarget, Macros},
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
  error::{GenerationError, Result},
  pantry::PantryGenerator,
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MealServiceConfig {
  /// The daily target is split evenly across this many meals.
  pub meals_per_day: usize,
  /// Allowed relative kcal deviation from the per-meal envelope.
  pub tolerance:     f64,
  /// Regenerations after the first attempt.
  pub max_retries:   u32,
  /// Upper bound for one generator call.
  pub timeout_secs:  u64,
}

impl Default for MealServiceConfig {
  fn default() -> Self {
    Self { meals_per_day: 3, tolerance: 0.10, max_retries: 2, timeout_secs: 30 }
  }
}

impl MealServiceConfig {
  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

/// What the caller wants for one batch of meals.
#[derive(Debug, Clone, Default)]
pub struct MealRequest {
  pub count:        usize,
  pub cuisine_tags: Vec<String>,
  pub dietary_tags: Vec<String>,
  pub avoid:        Vec<String>,
}

/// Hex SHA-256 of the request's canonical JSON encoding.
pub fn request_digest(request: &GenerationRequest) -> String {
  // Plain data; serialisation does not fail.
  let bytes = serde_json::to_vec(request).unwrap_or_default();
  hex::encode(Sha256::digest(&bytes))
}

// ─── Service ─────────────────────────────────────────────────────────────────

/// A candidate assigned to a slot, with where it came from.
#[derive(Clone)]
struct Pick {
  candidate: MealCandidate,
  attempt:   u32,
  digest:    String,
  generator: String,
  deviation: f64,
}

pub struct MealSuggestionService<G> {
  generator: G,
  fallback:  PantryGenerator,
  config:    MealServiceConfig,
}

impl<G: MealGenerator> MealSuggestionService<G> {
  pub fn new(generator: G, config: MealServiceConfig) -> Self {
    Self { generator, fallback: PantryGenerator::new(), config }
  }

  pub fn config(&self) -> &MealServiceConfig { &self.config }

  pub fn generator(&self) -> &G { &self.generator }

  /// Per-meal envelope: the daily target split across `meals_per_day`.
  pub fn meal_envelope(&self, target: &MacroTarget) -> Macros {
    target.envelope().scaled(1.0 / self.config.meals_per_day.max(1) as f64)
  }

  /// Suggest `count` meals for `target`. Returns exactly `count` meals or a
  /// validation error when `count` is zero.
  pub async fn suggest_meals(
    &self,
    target: &MacroTarget,
    cuisine_tags: &[String],
    count: usize,
  ) -> Result<Vec<MealSuggestion>> {
    let request = MealRequest { count, cuisine_tags: cuisine_tags.to_vec(), ..Default::default() };
    self.suggest(target, &request).await
  }

  /// [`suggest_meals`](Self::suggest_meals) with dietary tags and exclusions.
  pub async fn suggest(
    &self,
    target: &MacroTarget,
    request: &MealRequest,
  ) -> Result<Vec<MealSuggestion>> {
    if request.count == 0 {
      return Err(macrocoach_core::Error::validation("count", "must be at least 1").into());
    }

    let slots = MealType::for_day(request.count);
    let envelope = self.meal_envelope(target);
    let picks = self.fill(&slots, envelope, request).await;

    let created_at = Utc::now();
    Ok(
      slots
        .into_iter()
        .zip(picks)
        .map(|(meal_type, (pick, low_confidence, degraded))| {
          to_suggestion(
            &target.user_id,
            target.date,
            meal_type,
            pick,
            low_confidence,
            degraded,
            None,
            created_at,
          )
        })
        .collect(),
    )
  }

  /// One replacement for `original`, same meal type and envelope. Without a
  /// target, the original meal's own macros are the envelope.
  pub async fn replace_meal(
    &self,
    original: &MealSuggestion,
    target: Option<&MacroTarget>,
    dietary_tags: &[String],
  ) -> Result<MealSuggestion> {
    let envelope = match target {
      Some(t) => self.meal_envelope(t),
      None => original.macros,
    };
    let request = MealRequest {
      count:        1,
      cuisine_tags: original.cuisine.iter().cloned().collect(),
      dietary_tags: dietary_tags.to_vec(),
      avoid:        vec![original.name.clone()],
    };

    let slots = [original.meal_type];
    let mut picks = self.fill(&slots, envelope, &request).await;
    let (pick, low_confidence, degraded) = picks
      .pop()
      .ok_or_else(|| GenerationError::Malformed("no replacement produced".into()))?;

    Ok(to_suggestion(
      &original.user_id,
      original.date,
      original.meal_type,
      pick,
      low_confidence,
      degraded,
      Some(original.meal_id),
      Utc::now(),
    ))
  }

  /// Fill every slot: attempt 0 plus up to `max_retries` regenerations for
  /// the slots still missing, then the closest invalid candidate, then the
  /// pantry. Returns `(pick, low_confidence, degraded)` per slot; a meal is
  /// low confidence iff its kcal misses the envelope by more than the
  /// tolerance, wherever it came from.
  async fn fill(
    &self,
    slots: &[MealType],
    envelope: Macros,
    request: &MealRequest,
  ) -> Vec<(Pick, bool, bool)> {
    let mut valid: Vec<Option<Pick>> = vec![None; slots.len()];
    let mut closest: Vec<Option<Pick>> = vec![None; slots.len()];
    let timeout = self.config.timeout();

    for attempt in 0..=self.config.max_retries {
      let missing: Vec<usize> = (0..slots.len()).filter(|&i| valid[i].is_none()).collect();
      if missing.is_empty() {
        break;
      }

      let gen_request = GenerationRequest {
        envelope,
        meal_types: missing.iter().map(|&i| slots[i]).collect(),
        cuisine_tags: request.cuisine_tags.clone(),
        dietary_tags: request.dietary_tags.clone(),
        avoid: request.avoid.clone(),
      };
      let digest = request_digest(&gen_request);
      tracing::debug!(attempt, missing = missing.len(), %digest, "generating meals");

      let candidates =
        match tokio::time::timeout(timeout, self.generator.generate(&gen_request)).await {
          Ok(Ok(c)) => c,
          Ok(Err(e)) => {
            tracing::warn!(attempt, missing = missing.len(), %digest, error = %e, "generation failed");
            continue;
          }
          Err(_) => {
            let e = GenerationError::Timeout(timeout);
            tracing::warn!(attempt, missing = missing.len(), %digest, error = %e, "generation timed out");
            continue;
          }
        };

      let mut open = missing.clone();
      for candidate in candidates {
        let Some(pos) = open
          .iter()
          .position(|&i| slots[i] == candidate.meal_type)
          .or(if open.is_empty() { None } else { Some(0) })
        else {
          break;
        };
        let slot = open.remove(pos);

        let deviation = kcal_deviation(candidate.macros.kcal, envelope.kcal);
        let pick = Pick {
          candidate,
          attempt,
          digest: digest.clone(),
          generator: self.generator.name().to_owned(),
          deviation,
        };

        if deviation <= self.config.tolerance {
          valid[slot] = Some(pick);
        } else if closest[slot].as_ref().is_none_or(|c| deviation < c.deviation) {
          closest[slot] = Some(pick);
        }
      }

      let still_missing = valid.iter().filter(|v| v.is_none()).count();
      if still_missing > 0 && attempt < self.config.max_retries {
        tracing::info!(attempt, missing = still_missing, %digest, "regenerating out-of-tolerance meals");
      }
    }

    // Slots nothing usable was produced for go to the pantry in one batch.
    let empty: Vec<usize> = (0..slots.len())
      .filter(|&i| valid[i].is_none() && closest[i].is_none())
      .collect();
    let degraded = if empty.is_empty() {
      Vec::new()
    } else {
      self.degrade(slots, &empty, envelope, request)
    };
    let mut degraded_picks = degraded.into_iter();

    slots
      .iter()
      .enumerate()
      .map(|(i, meal_type)| {
        if let Some(pick) = valid[i].take() {
          return (pick, false, false);
        }
        if let Some(pick) = closest[i].take() {
          tracing::warn!(
            slot = i,
            meal_type = %meal_type,
            deviation = pick.deviation,
            digest = %pick.digest,
            "no candidate within tolerance; keeping closest as low confidence"
          );
          return (pick, true, false);
        }
        // Pantry meals are scaled to the envelope; only a miss is low confidence.
        let pick = degraded_picks
          .next()
          .unwrap_or_else(|| self.pantry_pick(*meal_type, envelope, request));
        let low_confidence = pick.deviation > self.config.tolerance;
        (pick, low_confidence, true)
      })
      .collect()
  }

  fn degrade(
    &self,
    slots: &[MealType],
    empty: &[usize],
    envelope: Macros,
    request: &MealRequest,
  ) -> Vec<Pick> {
    let gen_request = GenerationRequest {
      envelope,
      meal_types: empty.iter().map(|&i| slots[i]).collect(),
      cuisine_tags: request.cuisine_tags.clone(),
      dietary_tags: request.dietary_tags.clone(),
      avoid: request.avoid.clone(),
    };
    let digest = request_digest(&gen_request);
    tracing::warn!(missing = empty.len(), %digest, "generator produced nothing; using pantry");

    self
      .fallback
      .candidates(&gen_request)
      .into_iter()
      .map(|candidate| Pick {
        deviation: kcal_deviation(candidate.macros.kcal, envelope.kcal),
        candidate,
        attempt: self.config.max_retries + 1,
        digest: digest.clone(),
        generator: PantryGenerator::NAME.to_owned(),
      })
      .collect()
  }

  /// A single pantry meal, for a slot the batch fallback did not cover.
  fn pantry_pick(&self, meal_type: MealType, envelope: Macros, request: &MealRequest) -> Pick {
    let mut picks = self.degrade(&[meal_type], &[0], envelope, request);
    picks.pop().unwrap_or_else(|| Pick {
      candidate: MealCandidate {
        name:         format!("Balanced {meal_type}"),
        meal_type,
        macros:       envelope,
        cuisine:      None,
        ingredients:  Vec::new(),
        instructions: Vec::new(),
      },
      attempt:   self.config.max_retries + 1,
      digest:    String::new(),
      generator: PantryGenerator::NAME.to_owned(),
      deviation: 0.0,
    })
  }
}

/// `|kcal - share| / share`; non-finite or non-positive values never pass.
fn kcal_deviation(kcal: f64, share: f64) -> f64 {
  if !kcal.is_finite() || kcal <= 0.0 || share <= 0.0 {
    return f64::INFINITY;
  }
  (kcal - share).abs() / share
}

#[allow(clippy::too_many_arguments)]
fn to_suggestion(
  user_id: &str,
  date: chrono::NaiveDate,
  meal_type: MealType,
  pick: Pick,
  low_confidence: bool,
  degraded: bool,
  replaces: Option<Uuid>,
  created_at: chrono::DateTime<Utc>,
) -> MealSuggestion {
  let c = pick.candidate;
  MealSuggestion {
    meal_id: Uuid::new_v4(),
    user_id: user_id.to_owned(),
    date,
    name: c.name,
    meal_type,
    macros: c.macros,
    cuisine: c.cuisine,
    ingredients: c.ingredients,
    instructions: c.instructions,
    status: MealStatus::Proposed,
    low_confidence,
    provenance: Provenance {
      generator: pick.generator,
      attempt: pick.attempt,
      request_digest: pick.digest,
      degraded,
    },
    replaces,
    created_at,
  }
}

#[cfg(test)]
mod tests;
