//! `--seed-demo`: a profile and two weeks of synthetic metrics.

use chrono::{DateTime, Duration, Utc};
use macrocoach_connectors::DemoSource;
use macrocoach_core::{
  profile::{ActivityLevel, Goal, NewProfile, Sex},
  store::CoachStore,
};

pub const DEMO_DAYS: i64 = 14;

/// Seed `user_id` with a profile (unless one exists) and [`DEMO_DAYS`] days
/// of demo metrics ending at `now`. Returns the number of samples written.
pub async fn seed_demo<S: CoachStore>(
  store: &S,
  user_id: &str,
  now: DateTime<Utc>,
) -> Result<usize, S::Error> {
  if store.get_profile(user_id).await?.is_none() {
    let profile = NewProfile {
      user_id:             user_id.to_owned(),
      sex:                 Sex::Male,
      age:                 28,
      height_cm:           175.0,
      weight_kg:           82.0,
      activity_level:      ActivityLevel::Moderate,
      goal:                Goal::Lose,
      dietary_preferences: Default::default(),
    };
    store.save_profile(profile).await?;
  }

  let samples = DemoSource::default().generate(user_id, now - Duration::days(DEMO_DAYS), now);
  let count = samples.len();
  for sample in samples {
    store.save_metric(sample).await?;
  }
  tracing::info!(user_id, count, "seeded demo metrics");
  Ok(count)
}
