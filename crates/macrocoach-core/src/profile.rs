//! User profile: the body and goal data the planner works from.
//!
//! Profiles are versioned rather than edited. Saving a profile for an
//! existing user produces a new version; earlier versions stay readable.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Sex {
  #[strum(to_string = "male", serialize = "m")]
  Male,
  #[strum(to_string = "female", serialize = "f")]
  Female,
}

/// Self-reported activity level, mapped to a fixed TDEE multiplier.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivityLevel {
  Sedentary,
  #[serde(alias = "lightly_active")]
  #[strum(to_string = "light", serialize = "lightly_active")]
  Light,
  #[serde(alias = "moderately_active")]
  #[strum(to_string = "moderate", serialize = "moderately_active")]
  Moderate,
  Active,
  #[serde(alias = "extremely_active")]
  #[strum(to_string = "very_active", serialize = "extremely_active")]
  VeryActive,
}

impl ActivityLevel {
  /// Multiplier applied to BMR to obtain TDEE.
  pub const fn multiplier(self) -> f64 {
    match self {
      Self::Sedentary => 1.2,
      Self::Light => 1.375,
      Self::Moderate => 1.55,
      Self::Active => 1.725,
      Self::VeryActive => 1.9,
    }
  }

  /// Daily step goal.
  pub const fn daily_steps(self) -> u32 {
    match self {
      Self::Sedentary => 6_000,
      Self::Light => 8_000,
      Self::Moderate => 10_000,
      Self::Active => 12_000,
      Self::VeryActive => 15_000,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Goal {
  #[serde(alias = "lose_weight")]
  #[strum(to_string = "lose", serialize = "lose_weight", serialize = "cut")]
  Lose,
  #[serde(alias = "maintain_weight")]
  #[strum(to_string = "maintain", serialize = "maintain_weight")]
  Maintain,
  #[serde(alias = "gain_weight", alias = "gain_muscle")]
  #[strum(
    to_string = "gain",
    serialize = "gain_weight",
    serialize = "gain_muscle",
    serialize = "bulk"
  )]
  Gain,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// A profile as submitted by onboarding or a profile update. The store
/// assigns `version` and `recorded_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
  pub user_id:             String,
  pub sex:                 Sex,
  pub age:                 u32,
  pub height_cm:           f64,
  pub weight_kg:           f64,
  pub activity_level:      ActivityLevel,
  pub goal:                Goal,
  #[serde(default)]
  pub dietary_preferences: BTreeSet<String>,
}

impl NewProfile {
  /// Check the physiological invariants. Called by every store before a
  /// profile is written.
  pub fn validate(&self) -> Result<()> {
    if self.user_id.trim().is_empty() {
      return Err(Error::validation("user_id", "must not be empty"));
    }
    if self.age == 0 || self.age > 120 {
      return Err(Error::validation(
        "age",
        format!("{} is outside 1..=120", self.age),
      ));
    }
    if !self.height_cm.is_finite() || self.height_cm <= 0.0 || self.height_cm > 272.0 {
      return Err(Error::validation(
        "height_cm",
        format!("{} is outside (0, 272]", self.height_cm),
      ));
    }
    if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 || self.weight_kg > 650.0 {
      return Err(Error::validation(
        "weight_kg",
        format!("{} is outside (0, 650]", self.weight_kg),
      ));
    }
    Ok(())
  }
}

// ─── Stored ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  pub user_id:             String,
  /// 1 for the onboarding profile, incremented on every update.
  pub version:             u32,
  pub sex:                 Sex,
  pub age:                 u32,
  pub height_cm:           f64,
  pub weight_kg:           f64,
  pub activity_level:      ActivityLevel,
  pub goal:                Goal,
  pub dietary_preferences: BTreeSet<String>,
  pub recorded_at:         DateTime<Utc>,
}

impl UserProfile {
  /// Rebuild the input form, e.g. to apply a partial update on top of it.
  pub fn to_new(&self) -> NewProfile {
    NewProfile {
      user_id:             self.user_id.clone(),
      sex:                 self.sex,
      age:                 self.age,
      height_cm:           self.height_cm,
      weight_kg:           self.weight_kg,
      activity_level:      self.activity_level,
      goal:                self.goal,
      dietary_preferences: self.dietary_preferences.clone(),
    }
  }
}
