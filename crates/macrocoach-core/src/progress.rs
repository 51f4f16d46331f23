//! Progress over a metric window, summarised per UTC day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::metric::MetricSample;

/// Change in body weight between the first and last weighed day needed to
/// call a trend.
const TREND_THRESHOLD_KG: f64 = 0.5;
/// Weighed days needed before a trend is reported at all.
const TREND_MIN_DAYS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeightTrend {
  Increasing,
  Decreasing,
  Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
  pub days:             usize,
  pub avg_kcal_in:      f64,
  pub avg_kcal_out:     f64,
  /// Mean of each day's highest step count.
  pub avg_steps:        f64,
  pub avg_protein_g:    f64,
  pub weight_trend:     WeightTrend,
  /// Last weighed day minus first weighed day, when at least two days have
  /// a weight.
  pub weight_change_kg: Option<f64>,
  /// Days with at least one logged workout.
  pub workout_days:     usize,
  /// One entry per day with samples, oldest first.
  pub daily:            Vec<DaySummary>,
}

/// Intake against expenditure on one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
  pub date:         NaiveDate,
  pub kcal_in:      f64,
  pub kcal_out:     f64,
  /// `kcal_in - kcal_out`; negative is a deficit.
  pub kcal_balance: f64,
  pub steps:        u32,
  pub workouts:     usize,
}

#[derive(Default)]
struct Day {
  kcal_in:  f64,
  kcal_out: f64,
  protein:  f64,
  steps:    u32,
  weight:   Option<f64>,
  workouts: usize,
}

impl ProgressSummary {
  /// Summarise `metrics`, in any order. `None` when there are no samples.
  pub fn from_metrics(metrics: &[MetricSample]) -> Option<Self> {
    if metrics.is_empty() {
      return None;
    }

    let mut ordered: Vec<&MetricSample> = metrics.iter().collect();
    ordered.sort_by_key(|m| m.timestamp);

    let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
    for m in ordered {
      let day = days.entry(m.timestamp.date_naive()).or_default();
      let v = &m.values;
      day.kcal_in += v.kcal_in.unwrap_or(0.0);
      day.kcal_out += v.kcal_out.unwrap_or(0.0);
      day.protein += v.protein_g.unwrap_or(0.0);
      day.steps = day.steps.max(v.steps.unwrap_or(0));
      if v.weight_kg.is_some() {
        day.weight = v.weight_kg;
      }
      if v.workout_type.is_some() || v.workout_minutes.is_some() {
        day.workouts += 1;
      }
    }

    let n = days.len() as f64;
    let mean = |f: fn(&Day) -> f64| days.values().map(f).sum::<f64>() / n;

    let weights: Vec<f64> = days.values().filter_map(|d| d.weight).collect();
    let weight_change_kg = match (weights.first(), weights.last()) {
      (Some(first), Some(last)) if weights.len() >= 2 => Some(last - first),
      _ => None,
    };
    let weight_trend = match weight_change_kg {
      Some(delta) if weights.len() >= TREND_MIN_DAYS && delta > TREND_THRESHOLD_KG => {
        WeightTrend::Increasing
      }
      Some(delta) if weights.len() >= TREND_MIN_DAYS && delta < -TREND_THRESHOLD_KG => {
        WeightTrend::Decreasing
      }
      _ => WeightTrend::Stable,
    };

    Some(Self {
      days: days.len(),
      avg_kcal_in: mean(|d| d.kcal_in),
      avg_kcal_out: mean(|d| d.kcal_out),
      avg_steps: mean(|d| f64::from(d.steps)),
      avg_protein_g: mean(|d| d.protein),
      weight_trend,
      weight_change_kg,
      workout_days: days.values().filter(|d| d.workouts > 0).count(),
      daily: days
        .iter()
        .map(|(&date, d)| DaySummary {
          date,
          kcal_in: d.kcal_in,
          kcal_out: d.kcal_out,
          kcal_balance: d.kcal_in - d.kcal_out,
          steps: d.steps,
          workouts: d.workouts,
        })
        .collect(),
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Datelike, TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::metric::{Measurements, WorkoutType};

  fn at(day: u32, hour: u32, values: Measurements) -> MetricSample {
    let ts = Utc.with_ymd_and_hms(2024, 4, day, hour, 0, 0).unwrap();
    MetricSample {
      sample_id: Uuid::new_v4(),
      user_id: "u".into(),
      timestamp: ts,
      source: None,
      recorded_at: ts,
      values,
    }
  }

  fn weight(day: u32, kg: f64) -> MetricSample {
    at(day, 7, Measurements { weight_kg: Some(kg), ..Default::default() })
  }

  #[test]
  fn empty_window_has_no_summary() {
    assert!(ProgressSummary::from_metrics(&[]).is_none());
  }

  #[test]
  fn averages_are_per_day() {
    let metrics = [
      at(1, 8, Measurements { kcal_in: Some(600.0), steps: Some(3000), ..Default::default() }),
      at(1, 20, Measurements { kcal_in: Some(1400.0), steps: Some(8000), ..Default::default() }),
      at(2, 12, Measurements { kcal_in: Some(1800.0), steps: Some(4000), ..Default::default() }),
    ];
    let s = ProgressSummary::from_metrics(&metrics).unwrap();
    assert_eq!(s.days, 2);
    assert_eq!(s.avg_kcal_in, 1900.0);
    assert_eq!(s.avg_steps, 6000.0);
  }

  #[test]
  fn daily_balance_is_intake_minus_expenditure() {
    let metrics = [
      at(2, 19, Measurements { kcal_out: Some(2600.0), ..Default::default() }),
      at(1, 8, Measurements { kcal_in: Some(600.0), kcal_out: Some(300.0), ..Default::default() }),
      at(1, 20, Measurements { kcal_in: Some(1400.0), kcal_out: Some(1900.0), ..Default::default() }),
      at(2, 12, Measurements { kcal_in: Some(2900.0), steps: Some(9000), ..Default::default() }),
    ];
    let s = ProgressSummary::from_metrics(&metrics).unwrap();

    let dates: Vec<u32> = s.daily.iter().map(|d| d.date.day()).collect();
    assert_eq!(dates, [1, 2]);
    assert_eq!(s.daily[0].kcal_in, 2000.0);
    assert_eq!(s.daily[0].kcal_out, 2200.0);
    assert_eq!(s.daily[0].kcal_balance, -200.0);
    assert_eq!(s.daily[1].kcal_balance, 300.0);
    assert_eq!(s.daily[1].steps, 9000);
  }

  #[test]
  fn two_weighed_days_are_not_a_trend() {
    let s = ProgressSummary::from_metrics(&[weight(1, 80.0), weight(2, 82.0)]).unwrap();
    assert_eq!(s.weight_trend, WeightTrend::Stable);
    assert_eq!(s.weight_change_kg, Some(2.0));
  }

  #[test]
  fn decreasing_weight_is_detected_regardless_of_input_order() {
    let metrics = [weight(5, 78.9), weight(3, 79.5), weight(1, 80.0)];
    let s = ProgressSummary::from_metrics(&metrics).unwrap();
    assert_eq!(s.weight_trend, WeightTrend::Decreasing);
  }

  #[test]
  fn small_changes_are_stable() {
    let metrics = [weight(1, 80.0), weight(2, 80.2), weight(3, 80.4)];
    let s = ProgressSummary::from_metrics(&metrics).unwrap();
    assert_eq!(s.weight_trend, WeightTrend::Stable);
  }

  #[test]
  fn workout_days_are_counted_once() {
    let lift = Measurements {
      workout_type: Some(WorkoutType::Strength),
      workout_minutes: Some(45),
      ..Default::default()
    };
    let metrics = [at(1, 7, lift.clone()), at(1, 18, lift), weight(2, 80.0)];
    let s = ProgressSummary::from_metrics(&metrics).unwrap();
    assert_eq!(s.workout_days, 1);
  }
}
