//! Daily calorie and macro targets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A (kcal, protein, carbs, fat) tuple. Used for the nutrition of a single
/// meal and for the envelope a meal has to approximate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
  pub kcal:      f64,
  pub protein_g: f64,
  pub carbs_g:   f64,
  pub fat_g:     f64,
}

impl Macros {
  pub fn scaled(self, factor: f64) -> Self {
    Self {
      kcal:      self.kcal * factor,
      protein_g: self.protein_g * factor,
      carbs_g:   self.carbs_g * factor,
      fat_g:     self.fat_g * factor,
    }
  }
}

impl std::ops::Add for Macros {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self {
      kcal:      self.kcal + rhs.kcal,
      protein_g: self.protein_g + rhs.protein_g,
      carbs_g:   self.carbs_g + rhs.carbs_g,
      fat_g:     self.fat_g + rhs.fat_g,
    }
  }
}

impl std::iter::Sum for Macros {
  fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
    iter.fold(Self::default(), |acc, m| acc + m)
  }
}

/// Output of [`EnergyPlanner::compute_targets`](crate::planner::EnergyPlanner::compute_targets).
///
/// Carries the intermediate values so a reply can explain how the number was
/// reached. Contains no clock reading; the store stamps `computed_at` when it
/// persists the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroTarget {
  pub user_id:           String,
  pub date:              NaiveDate,
  pub kcal_target:       f64,
  pub protein_g_target:  f64,
  pub carbs_g_target:    f64,
  pub fat_g_target:      f64,
  pub bmr:               f64,
  pub tdee:              f64,
  /// Mean daily `kcal_out` over the metric window, when any was reported.
  pub observed_kcal_out: Option<f64>,
  /// Daily step goal for the profile's activity level.
  #[serde(default)]
  pub target_steps:           u32,
  #[serde(default)]
  pub target_workout_minutes: u32,
}

impl MacroTarget {
  /// The whole-day envelope.
  pub fn envelope(&self) -> Macros {
    Macros {
      kcal:      self.kcal_target,
      protein_g: self.protein_g_target,
      carbs_g:   self.carbs_g_target,
      fat_g:     self.fat_g_target,
    }
  }
}
