//! Normalised health samples.
//!
//! Every connector, the chat `/add` command and the JSON API produce the same
//! [`NewMetric`] shape. Samples are append-only: a later sample supersedes an
//! earlier one for reads, nothing is ever updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum WorkoutType {
  #[strum(to_string = "strength", serialize = "weights", serialize = "lifting")]
  Strength,
  Cardio,
  Yoga,
  #[strum(to_string = "walking", serialize = "walk")]
  Walking,
  #[strum(to_string = "running", serialize = "run")]
  Running,
  #[strum(to_string = "cycling", serialize = "bike", serialize = "ride")]
  Cycling,
  #[strum(to_string = "swimming", serialize = "swim")]
  Swimming,
  Other,
}

// ─── Measurements ────────────────────────────────────────────────────────────

/// The measured values of a sample. Every field is optional; a sample must
/// carry at least one of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
  /// Energy burned, kcal.
  pub kcal_out:        Option<f64>,
  /// Energy consumed, kcal.
  pub kcal_in:         Option<f64>,
  /// Beats per minute.
  pub heart_rate:      Option<u16>,
  pub steps:           Option<u32>,
  /// Sleep quality, 0–100.
  pub sleep_score:     Option<u8>,
  pub weight_kg:       Option<f64>,
  pub protein_g:       Option<f64>,
  pub carbs_g:         Option<f64>,
  pub fat_g:           Option<f64>,
  pub workout_type:    Option<WorkoutType>,
  /// Rate of perceived exertion, 1–10.
  pub rpe:             Option<u8>,
  pub workout_minutes: Option<u32>,
}

impl Measurements {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  /// Reject values outside physiological range.
  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::validation("sample", "carries no measurements"));
    }
    if let Some(hr) = self.heart_rate
      && (hr == 0 || hr > 300)
    {
      return Err(Error::validation(
        "heart_rate",
        format!("{hr} bpm is outside 1..=300"),
      ));
    }
    if let Some(score) = self.sleep_score
      && score > 100
    {
      return Err(Error::validation(
        "sleep_score",
        format!("{score} is outside 0..=100"),
      ));
    }
    if let Some(rpe) = self.rpe
      && !(1..=10).contains(&rpe)
    {
      return Err(Error::validation("rpe", format!("{rpe} is outside 1..=10")));
    }
    if let Some(steps) = self.steps
      && steps > 200_000
    {
      return Err(Error::validation(
        "steps",
        format!("{steps} is more than 200000"),
      ));
    }
    if let Some(minutes) = self.workout_minutes
      && minutes > 1440
    {
      return Err(Error::validation(
        "workout_minutes",
        format!("{minutes} is longer than a day"),
      ));
    }
    if let Some(w) = self.weight_kg
      && (!w.is_finite() || w <= 0.0 || w > 650.0)
    {
      return Err(Error::validation(
        "weight_kg",
        format!("{w} is outside (0, 650]"),
      ));
    }

    let quantities = [
      ("kcal_out", self.kcal_out),
      ("kcal_in", self.kcal_in),
      ("protein_g", self.protein_g),
      ("carbs_g", self.carbs_g),
      ("fat_g", self.fat_g),
    ];
    for (field, value) in quantities {
      if let Some(v) = value
        && (!v.is_finite() || v < 0.0)
      {
        return Err(Error::validation(field, format!("{v} must be a non-negative number")));
      }
    }

    Ok(())
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// A sample as produced by a connector or a user, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMetric {
  pub user_id:   String,
  pub timestamp: DateTime<Utc>,
  /// Where the sample came from, e.g. `"manual"` or `"healthkit"`.
  pub source:    Option<String>,
  #[serde(flatten)]
  pub values:    Measurements,
}

impl NewMetric {
  pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
    Self {
      user_id: user_id.into(),
      timestamp,
      source: None,
      values: Measurements::default(),
    }
  }

  pub fn with_source(mut self, source: impl Into<String>) -> Self {
    self.source = Some(source.into());
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.user_id.trim().is_empty() {
      return Err(Error::validation("user_id", "must not be empty"));
    }
    self.values.validate()
  }
}

// ─── Stored ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
  pub sample_id:   Uuid,
  pub user_id:     String,
  /// When the measurement was taken.
  pub timestamp:   DateTime<Utc>,
  pub source:      Option<String>,
  /// When the store accepted the sample; server-assigned.
  pub recorded_at: DateTime<Utc>,
  #[serde(flatten)]
  pub values:      Measurements,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn sample(values: Measurements) -> NewMetric {
    NewMetric {
      user_id: "ada".into(),
      timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
      source: Some("manual".into()),
      values,
    }
  }

  #[test]
  fn empty_sample_is_rejected() {
    let err = sample(Measurements::default()).validate().unwrap_err();
    assert!(matches!(err, Error::Validation { field: "sample", .. }));
  }

  #[test]
  fn heart_rate_over_300_is_rejected() {
    let err = sample(Measurements { heart_rate: Some(400), ..Default::default() })
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "heart_rate", .. }));
  }

  #[test]
  fn zero_heart_rate_is_rejected() {
    assert!(
      sample(Measurements { heart_rate: Some(0), ..Default::default() })
        .validate()
        .is_err()
    );
  }

  #[test]
  fn sleep_score_over_100_is_rejected() {
    let err = sample(Measurements { sleep_score: Some(101), ..Default::default() })
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "sleep_score", .. }));
  }

  #[test]
  fn negative_protein_is_rejected() {
    let err = sample(Measurements { protein_g: Some(-5.0), ..Default::default() })
      .validate()
      .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "protein_g", .. }));
  }

  #[test]
  fn plausible_sample_passes() {
    let m = Measurements {
      heart_rate: Some(62),
      steps: Some(9_200),
      sleep_score: Some(81),
      weight_kg: Some(72.4),
      rpe: Some(7),
      workout_type: Some(WorkoutType::Strength),
      ..Default::default()
    };
    assert!(sample(m).validate().is_ok());
  }

  #[test]
  fn flattened_json_shape() {
    let m = sample(Measurements { steps: Some(1200), ..Default::default() });
    let json = serde_json::to_value(&m).unwrap();
    assert_eq!(json["steps"], 1200);
    assert_eq!(json["source"], "manual");
  }
}
