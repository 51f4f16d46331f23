//! Deterministic synthetic history for demo accounts.
//!
//! One daily sample at 12:00 UTC (steps, energy, resting heart rate, sleep,
//! weight, intake) and an evening workout every other day. Values vary with
//! the day but the same range always yields the same samples, so seeding
//! twice gives identical data.

use std::convert::Infallible;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use macrocoach_core::{
  metric::{Measurements, NewMetric, WorkoutType},
  source::MetricSource,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

pub const SOURCE: &str = "demo";

const WORKOUTS: [WorkoutType; 3] = [WorkoutType::Strength, WorkoutType::Cardio, WorkoutType::Walking];

#[derive(Debug, Clone)]
pub struct DemoSource {
  seed:         u64,
  /// Weight the two-month cycle starts from; drifts down slowly.
  start_weight: f64,
}

impl Default for DemoSource {
  fn default() -> Self { Self::new(42) }
}

impl DemoSource {
  pub fn new(seed: u64) -> Self { Self { seed, start_weight: 82.0 } }

  fn day(&self, user_id: &str, day: i64, noon: DateTime<Utc>) -> Vec<NewMetric> {
    let mut rng = StdRng::seed_from_u64(self.seed ^ day as u64);
    let weight = self.start_weight - 0.05 * (day.rem_euclid(60) as f64)
      + f64::from(rng.gen_range(0..=8u32)) / 10.0
      - 0.4;

    let mut out = vec![NewMetric {
      user_id:   user_id.to_owned(),
      timestamp: noon,
      source:    Some(SOURCE.to_owned()),
      values:    Measurements {
        steps: Some(rng.gen_range(6_000..=15_000)),
        kcal_out: Some(f64::from(rng.gen_range(1_900..=2_700u32))),
        kcal_in: Some(f64::from(rng.gen_range(1_700..=2_500u32))),
        heart_rate: Some(rng.gen_range(58..=72)),
        sleep_score: Some(rng.gen_range(65..=95)),
        weight_kg: Some((weight * 10.0).round() / 10.0),
        protein_g: Some(f64::from(rng.gen_range(90..=160u32))),
        ..Default::default()
      },
    }];

    if day.rem_euclid(2) == 0 {
      let kind = WORKOUTS[rng.gen_range(0..WORKOUTS.len())];
      out.push(NewMetric {
        user_id:   user_id.to_owned(),
        timestamp: noon + Duration::hours(6),
        source:    Some(SOURCE.to_owned()),
        values:    Measurements {
          workout_type: Some(kind),
          workout_minutes: Some(rng.gen_range(30..=75)),
          kcal_out: Some(f64::from(rng.gen_range(200..=550u32))),
          heart_rate: Some(rng.gen_range(120..=165)),
          rpe: Some(rng.gen_range(5..=9)),
          ..Default::default()
        },
      });
    }
    out
  }

  /// Every sample in `since <= timestamp < until`, oldest first.
  pub fn generate(&self, user_id: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<NewMetric> {
    let mut out = Vec::new();
    let mut date = since.date_naive();
    while date <= until.date_naive() {
      let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()).and_utc();
      let day = i64::from(date.num_days_from_ce());
      out.extend(
        self
          .day(user_id, day, noon)
          .into_iter()
          .filter(|m| since <= m.timestamp && m.timestamp < until),
      );
      let Some(next) = date.succ_opt() else { break };
      date = next;
    }
    out
  }
}

impl MetricSource for DemoSource {
  type Error = Infallible;

  fn name(&self) -> &str { SOURCE }

  async fn fetch(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<NewMetric>, Infallible> {
    Ok(self.generate(user_id, since, until))
  }
}
