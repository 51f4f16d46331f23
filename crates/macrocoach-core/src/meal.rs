//! Meal suggestions and their lifecycle.
//!
//! A suggestion starts out `proposed`. It can move once, to `accepted` or to
//! `swapped`; the transition is recorded separately and the original row is
//! never touched, so a swapped meal stays readable next to its replacement.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::target::Macros;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MealType {
  Breakfast,
  Lunch,
  Dinner,
  Snack,
}

impl MealType {
  /// Slot order for a plan of `n` meals: the three main meals first, snacks
  /// after that.
  pub fn for_day(n: usize) -> Vec<MealType> {
    const MAIN: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];
    (0..n)
      .map(|i| MAIN.get(i).copied().unwrap_or(MealType::Snack))
      .collect()
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MealStatus {
  Proposed,
  Accepted,
  Swapped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  pub name:   String,
  pub amount: f64,
  /// `g`, `ml`, `piece`, ...
  pub unit:   String,
}

/// How a suggestion came about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  /// Name reported by the generator that produced the candidate.
  pub generator:      String,
  /// 0 for the first call, incremented on each regeneration.
  pub attempt:        u32,
  /// Hex SHA-256 of the canonical generation request.
  pub request_digest: String,
  /// Set when the suggestion came from the offline fallback because the
  /// primary generator produced nothing.
  pub degraded:       bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSuggestion {
  pub meal_id:        Uuid,
  pub user_id:        String,
  pub date:           NaiveDate,
  pub name:           String,
  pub meal_type:      MealType,
  pub macros:         Macros,
  pub cuisine:        Option<String>,
  pub ingredients:    Vec<Ingredient>,
  pub instructions:   Vec<String>,
  pub status:         MealStatus,
  /// The meal missed the macro tolerance on every attempt.
  pub low_confidence: bool,
  pub provenance:     Provenance,
  /// For a swap replacement, the meal it stands in for.
  pub replaces:       Option<Uuid>,
  pub created_at:     DateTime<Utc>,
}

/// A recorded status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealTransition {
  pub meal_id:        Uuid,
  pub status:         MealStatus,
  pub replacement_id: Option<Uuid>,
  pub recorded_at:    DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slots_for_three_meals() {
    assert_eq!(
      MealType::for_day(3),
      vec![MealType::Breakfast, MealType::Lunch, MealType::Dinner]
    );
  }

  #[test]
  fn extra_slots_are_snacks() {
    let slots = MealType::for_day(5);
    assert_eq!(slots[3], MealType::Snack);
    assert_eq!(slots[4], MealType::Snack);
  }

  #[test]
  fn status_round_trips_through_strings() {
    assert_eq!(MealStatus::Swapped.to_string(), "swapped");
    assert_eq!("ACCEPTED".parse::<MealStatus>().unwrap(), MealStatus::Accepted);
  }
}
