//! `EnergyPlanner`: profile plus recent metrics to a daily macro target.
//!
//! BMR is Mifflin-St Jeor; TDEE is BMR scaled by the activity multiplier,
//! optionally blended toward the energy expenditure the user actually
//! reported. The goal shifts the calorie target and the macro split follows
//! from it. Pure arithmetic: no clock, no randomness, no I/O.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  metric::MetricSample,
  profile::{ActivityLevel, Goal, Sex, UserProfile},
  target::MacroTarget,
};

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

// ─── Config ──────────────────────────────────────────────────────────────────

/// Tunable constants. Every field has a default so a partial `[planner]`
/// config section is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
  /// Weight given to observed `kcal_out` when blending it into TDEE, 0–1.
  pub blend_weight:      f64,
  pub lose_deficit_kcal: f64,
  pub gain_surplus_kcal: f64,
  pub protein_g_per_kg:  f64,
  /// Share of the calorie target that comes from fat.
  pub fat_share:         f64,
}

impl Default for PlannerConfig {
  fn default() -> Self {
    Self {
      blend_weight:      0.3,
      lose_deficit_kcal: 500.0,
      gain_surplus_kcal: 300.0,
      protein_g_per_kg:  1.8,
      fat_share:         0.25,
    }
  }
}

// ─── Planner ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct EnergyPlanner {
  config: PlannerConfig,
}

impl EnergyPlanner {
  pub fn new(config: PlannerConfig) -> Self { Self { config } }

  pub fn config(&self) -> &PlannerConfig { &self.config }

  /// Mifflin-St Jeor basal metabolic rate, kcal/day.
  pub fn bmr(profile: &UserProfile) -> f64 {
    let base = 10.0 * profile.weight_kg + 6.25 * profile.height_cm
      - 5.0 * f64::from(profile.age);
    match profile.sex {
      Sex::Male => base + 5.0,
      Sex::Female => base - 161.0,
    }
  }

  /// Daily workout minutes: 45 while losing or gaining, 60 for the two most
  /// active levels otherwise, 30 for everyone else.
  pub fn workout_minutes(profile: &UserProfile) -> u32 {
    match (profile.goal, profile.activity_level) {
      (Goal::Lose | Goal::Gain, _) => 45,
      (_, ActivityLevel::Active | ActivityLevel::VeryActive) => 60,
      _ => 30,
    }
  }

  /// Mean of the per-day `kcal_out` totals in `metrics`, or `None` when no
  /// sample reports it. Days are UTC calendar days.
  pub fn observed_kcal_out(metrics: &[MetricSample]) -> Option<f64> {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for sample in metrics {
      if let Some(kcal) = sample.values.kcal_out {
        *per_day.entry(sample.timestamp.date_naive()).or_default() += kcal;
      }
    }
    if per_day.is_empty() {
      return None;
    }
    Some(per_day.values().sum::<f64>() / per_day.len() as f64)
  }

  /// Derive the target for `date`.
  ///
  /// With no metrics (or none carrying `kcal_out`) the result depends on the
  /// profile alone.
  pub fn compute_targets(
    &self,
    profile: &UserProfile,
    recent_metrics: &[MetricSample],
    date: NaiveDate,
  ) -> MacroTarget {
    let cfg = &self.config;

    let bmr = Self::bmr(profile);
    let theoretical = bmr * profile.activity_level.multiplier();

    let observed = Self::observed_kcal_out(recent_metrics);
    let tdee = match observed {
      Some(avg) => {
        let w = cfg.blend_weight.clamp(0.0, 1.0);
        (1.0 - w) * theoretical + w * avg
      }
      None => theoretical,
    };

    let kcal = match profile.goal {
      Goal::Lose => (tdee - cfg.lose_deficit_kcal).max(bmr),
      Goal::Maintain => tdee,
      Goal::Gain => tdee + cfg.gain_surplus_kcal,
    };

    let protein_g = profile.weight_kg * cfg.protein_g_per_kg;
    let fat_g = kcal * cfg.fat_share / KCAL_PER_G_FAT;
    let carbs_g = ((kcal - protein_g * KCAL_PER_G_PROTEIN - fat_g * KCAL_PER_G_FAT)
      / KCAL_PER_G_CARBS)
      .max(0.0);

    MacroTarget {
      user_id: profile.user_id.clone(),
      date,
      kcal_target: kcal,
      protein_g_target: protein_g,
      carbs_g_target: carbs_g,
      fat_g_target: fat_g,
      bmr,
      tdee,
      observed_kcal_out: observed,
      target_steps: profile.activity_level.daily_steps(),
      target_workout_minutes: Self::workout_minutes(profile),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeSet;

  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::metric::Measurements;

  fn profile(goal: Goal, activity_level: ActivityLevel) -> UserProfile {
    UserProfile {
      user_id: "u1".into(),
      version: 1,
      sex: Sex::Male,
      age: 30,
      height_cm: 180.0,
      weight_kg: 80.0,
      activity_level,
      goal,
      dietary_preferences: BTreeSet::new(),
      recorded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
  }

  fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 10).unwrap() }

  fn burn(day: u32, hour: u32, kcal: f64) -> MetricSample {
    MetricSample {
      sample_id: Uuid::new_v4(),
      user_id: "u1".into(),
      timestamp: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
      source: None,
      recorded_at: Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap(),
      values: Measurements { kcal_out: Some(kcal), ..Default::default() },
    }
  }

  fn approx(a: f64, b: f64) -> bool { (a - b).abs() < 1e-6 }

  #[test]
  fn sedentary_male_maintain() {
    let planner = EnergyPlanner::default();
    let t = planner.compute_targets(
      &profile(Goal::Maintain, ActivityLevel::Sedentary),
      &[],
      date(),
    );
    assert!(approx(t.bmr, 1780.0));
    assert!(approx(t.tdee, 2136.0));
    assert!(approx(t.kcal_target, 2136.0));
    assert!(t.observed_kcal_out.is_none());
  }

  #[test]
  fn lose_is_floored_at_bmr() {
    let planner = EnergyPlanner::default();
    let t = planner.compute_targets(
      &profile(Goal::Lose, ActivityLevel::Sedentary),
      &[],
      date(),
    );
    // 2136 - 500 = 1636 would dip under the 1780 BMR.
    assert!(approx(t.kcal_target, 1780.0));
  }

  #[test]
  fn lose_applies_full_deficit_above_floor() {
    let planner = EnergyPlanner::default();
    let t = planner.compute_targets(
      &profile(Goal::Lose, ActivityLevel::Moderate),
      &[],
      date(),
    );
    assert!(approx(t.tdee, 2759.0));
    assert!(approx(t.kcal_target, 2259.0));
  }

  #[test]
  fn gain_adds_surplus() {
    let t = EnergyPlanner::default().compute_targets(
      &profile(Goal::Gain, ActivityLevel::Sedentary),
      &[],
      date(),
    );
    assert!(approx(t.kcal_target, 2436.0));
  }

  #[test]
  fn activity_targets_follow_level_and_goal() {
    let planner = EnergyPlanner::default();
    let cases = [
      (Goal::Maintain, ActivityLevel::Sedentary, 6_000, 30),
      (Goal::Maintain, ActivityLevel::Moderate, 10_000, 30),
      (Goal::Maintain, ActivityLevel::VeryActive, 15_000, 60),
      (Goal::Lose, ActivityLevel::Active, 12_000, 45),
      (Goal::Gain, ActivityLevel::Light, 8_000, 45),
    ];
    for (goal, level, steps, minutes) in cases {
      let t = planner.compute_targets(&profile(goal, level), &[], date());
      assert_eq!(t.target_steps, steps, "{goal} {level}");
      assert_eq!(t.target_workout_minutes, minutes, "{goal} {level}");
    }
  }

  #[test]
  fn female_bmr_uses_lower_constant() {
    let mut p = profile(Goal::Maintain, ActivityLevel::Sedentary);
    p.sex = Sex::Female;
    assert!(approx(EnergyPlanner::bmr(&p), 1614.0));
  }

  #[test]
  fn macro_split() {
    let t = EnergyPlanner::default().compute_targets(
      &profile(Goal::Maintain, ActivityLevel::Sedentary),
      &[],
      date(),
    );
    assert!(approx(t.protein_g_target, 144.0));
    assert!(approx(t.fat_g_target, 2136.0 * 0.25 / 9.0));
    let carbs = (2136.0 - 144.0 * 4.0 - 2136.0 * 0.25) / 4.0;
    assert!(approx(t.carbs_g_target, carbs));
  }

  #[test]
  fn carbs_never_go_negative() {
    // Heavy and short with a big deficit: protein alone exceeds the budget.
    let mut p = profile(Goal::Lose, ActivityLevel::Sedentary);
    p.weight_kg = 300.0;
    p.height_cm = 120.0;
    p.age = 90;
    let cfg = PlannerConfig { protein_g_per_kg: 3.0, ..Default::default() };
    let t = EnergyPlanner::new(cfg).compute_targets(&p, &[], date());
    assert!(t.protein_g_target > 0.0);
    assert_eq!(t.carbs_g_target, 0.0);
  }

  #[test]
  fn observed_burn_is_blended() {
    let metrics = [burn(8, 9, 1500.0), burn(8, 18, 1000.0), burn(9, 12, 2000.0)];
    let t = EnergyPlanner::default().compute_targets(
      &profile(Goal::Maintain, ActivityLevel::Sedentary),
      &metrics,
      date(),
    );
    // Daily totals 2500 and 2000, mean 2250.
    assert_eq!(t.observed_kcal_out, Some(2250.0));
    assert!(approx(t.tdee, 0.7 * 2136.0 + 0.3 * 2250.0));
  }

  #[test]
  fn metrics_without_burn_fall_back_to_profile() {
    let mut sample = burn(8, 9, 0.0);
    sample.values = Measurements { steps: Some(9000), ..Default::default() };
    let p = profile(Goal::Maintain, ActivityLevel::Sedentary);
    let planner = EnergyPlanner::default();
    assert_eq!(
      planner.compute_targets(&p, &[sample], date()),
      planner.compute_targets(&p, &[], date())
    );
  }

  #[test]
  fn output_is_deterministic() {
    let metrics = [burn(8, 9, 2431.7), burn(9, 10, 1987.3)];
    let p = profile(Goal::Gain, ActivityLevel::VeryActive);
    let planner = EnergyPlanner::default();
    let a = planner.compute_targets(&p, &metrics, date());
    let b = planner.compute_targets(&p, &metrics, date());
    assert_eq!(a.kcal_target.to_bits(), b.kcal_target.to_bits());
    assert_eq!(a.carbs_g_target.to_bits(), b.carbs_g_target.to_bits());
    assert_eq!(a, b);
  }
}
