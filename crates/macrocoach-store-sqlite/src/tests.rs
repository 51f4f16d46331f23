//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use macrocoach_core::{
  meal::{Ingredient, MealStatus, MealSuggestion, MealType, Provenance},
  metric::{Measurements, NewMetric},
  profile::{ActivityLevel, Goal, NewProfile, Sex},
  store::CoachStore,
  target::{MacroTarget, Macros},
  turn::NewTurn,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

fn core_err(e: Error) -> macrocoach_core::Error {
  match e {
    Error::Core(e) => e,
    other => panic!("expected a core error, got {other:?}"),
  }
}

// ─── Profiles ────────────────────────────────────────────────────────────────

fn new_profile(user_id: &str, weight_kg: f64) -> NewProfile {
  NewProfile {
    user_id: user_id.into(),
    sex: Sex::Female,
    age: 41,
    height_cm: 165.0,
    weight_kg,
    activity_level: ActivityLevel::Light,
    goal: Goal::Lose,
    dietary_preferences: BTreeSet::from(["vegetarian".to_string()]),
  }
}

#[tokio::test]
async fn missing_profile_is_none() {
  let s = store().await;
  assert!(s.get_profile("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn profile_updates_create_versions() {
  let s = store().await;

  let v1 = s.save_profile(new_profile("ada", 70.0)).await.unwrap();
  let v2 = s.save_profile(new_profile("ada", 68.5)).await.unwrap();
  assert_eq!(v1.version, 1);
  assert_eq!(v2.version, 2);

  let current = s.get_profile("ada").await.unwrap().unwrap();
  assert_eq!(current.version, 2);
  assert_eq!(current.weight_kg, 68.5);
  assert!(current.dietary_preferences.contains("vegetarian"));

  let history = s.profile_history("ada").await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[1].weight_kg, 70.0);
}

#[tokio::test]
async fn versions_are_per_user() {
  let s = store().await;
  s.save_profile(new_profile("ada", 70.0)).await.unwrap();
  let other = s.save_profile(new_profile("bob", 90.0)).await.unwrap();
  assert_eq!(other.version, 1);
}

#[tokio::test]
async fn invalid_profile_is_not_written() {
  let s = store().await;
  let err = s.save_profile(new_profile("ada", 0.0)).await.unwrap_err();
  assert!(core_err(err).is_validation());
  assert!(s.profile_history("ada").await.unwrap().is_empty());
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

fn metric(ts: DateTime<Utc>, values: Measurements) -> NewMetric {
  NewMetric { user_id: "ada".into(), timestamp: ts, source: Some("manual".into()), values }
}

fn steps(n: u32) -> Measurements { Measurements { steps: Some(n), ..Default::default() } }

#[tokio::test]
async fn save_and_read_metric() {
  let s = store().await;
  let saved = s.save_metric(metric(at(3, 9), steps(8000))).await.unwrap();

  let got = s.get_latest_metrics("ada", 7, at(4, 0)).await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].sample_id, saved.sample_id);
  assert_eq!(got[0].values.steps, Some(8000));
  assert_eq!(got[0].source.as_deref(), Some("manual"));
}

#[tokio::test]
async fn out_of_range_heart_rate_is_rejected_and_not_stored() {
  let s = store().await;
  let hr = Measurements { heart_rate: Some(400), ..Default::default() };
  let err = s.save_metric(metric(at(3, 9), hr)).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    macrocoach_core::Error::Validation { field: "heart_rate", .. }
  ));
  assert!(s.get_latest_metrics("ada", 7, at(4, 0)).await.unwrap().is_empty());
}

#[tokio::test]
async fn window_bounds_are_inclusive_and_newest_first() {
  let s = store().await;
  s.save_metric(metric(at(1, 0), steps(1))).await.unwrap();
  s.save_metric(metric(at(2, 0), steps(2))).await.unwrap();
  s.save_metric(metric(at(8, 0), steps(8))).await.unwrap();
  s.save_metric(metric(at(9, 0), steps(9))).await.unwrap();

  let got = s.get_latest_metrics("ada", 7, at(8, 0)).await.unwrap();
  let seen: Vec<u32> = got.iter().filter_map(|m| m.values.steps).collect();
  assert_eq!(seen, vec![8, 2, 1]);
}

#[tokio::test]
async fn duplicate_timestamps_resolve_to_last_write() {
  let s = store().await;
  s.save_metric(metric(at(5, 12), steps(100))).await.unwrap();
  s.save_metric(metric(at(5, 12), steps(200))).await.unwrap();

  let got = s.get_latest_metrics("ada", 7, at(6, 0)).await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].values.steps, Some(200));
}

#[tokio::test]
async fn metrics_are_scoped_to_user() {
  let s = store().await;
  s.save_metric(metric(at(5, 12), steps(100))).await.unwrap();
  let mut other = metric(at(5, 12), steps(5));
  other.user_id = "bob".into();
  s.save_metric(other).await.unwrap();

  let got = s.get_latest_metrics("bob", 7, at(6, 0)).await.unwrap();
  assert_eq!(got.len(), 1);
  assert_eq!(got[0].values.steps, Some(5));
}

#[tokio::test]
async fn oversized_window_is_a_validation_error() {
  let s = store().await;
  s.save_metric(metric(at(5, 12), steps(100))).await.unwrap();

  let err = s.get_latest_metrics("ada", u32::MAX, at(10, 12)).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    macrocoach_core::Error::Validation { field: "window_days", .. }
  ));

  // Large but representable windows still read normally.
  let got = s.get_latest_metrics("ada", 3_650_000, at(10, 12)).await.unwrap();
  assert_eq!(got.len(), 1);
}

// ─── Targets ─────────────────────────────────────────────────────────────────

fn target(kcal: f64) -> MacroTarget {
  MacroTarget {
    user_id: "ada".into(),
    date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
    kcal_target: kcal,
    protein_g_target: 120.0,
    carbs_g_target: 200.0,
    fat_g_target: 60.0,
    bmr: 1400.0,
    tdee: kcal,
    observed_kcal_out: None,
    target_steps: 8_000,
    target_workout_minutes: 45,
  }
}

#[tokio::test]
async fn latest_target_is_the_last_saved() {
  let s = store().await;
  assert!(s.latest_target("ada").await.unwrap().is_none());

  s.save_target(target(2000.0)).await.unwrap();
  s.save_target(target(1900.0)).await.unwrap();

  let latest = s.latest_target("ada").await.unwrap().unwrap();
  assert_eq!(latest.target.kcal_target, 1900.0);

  let history = s.target_history("ada", 10).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[1].target, target(2000.0));
}

#[tokio::test]
async fn target_for_date_ignores_other_days() {
  let s = store().await;
  let day = target(2000.0).date;
  assert!(s.target_for_date("ada", day).await.unwrap().is_none());

  s.save_target(target(2000.0)).await.unwrap();
  s.save_target(target(1950.0)).await.unwrap();
  let mut next_day = target(2400.0);
  next_day.date = day.succ_opt().unwrap();
  s.save_target(next_day).await.unwrap();

  let found = s.target_for_date("ada", day).await.unwrap().unwrap();
  assert_eq!(found.target.kcal_target, 1950.0);
  assert_eq!(s.latest_target("ada").await.unwrap().unwrap().target.kcal_target, 2400.0);
}

// ─── Meals ───────────────────────────────────────────────────────────────────

fn meal(name: &str, replaces: Option<Uuid>) -> MealSuggestion {
  MealSuggestion {
    meal_id: Uuid::new_v4(),
    user_id: "ada".into(),
    date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
    name: name.into(),
    meal_type: MealType::Lunch,
    macros: Macros { kcal: 650.0, protein_g: 40.0, carbs_g: 70.0, fat_g: 20.0 },
    cuisine: Some("turkish".into()),
    ingredients: vec![Ingredient { name: "bulgur".into(), amount: 80.0, unit: "g".into() }],
    instructions: vec!["Cook the bulgur.".into()],
    status: MealStatus::Proposed,
    low_confidence: false,
    provenance: Provenance {
      generator:      "test".into(),
      attempt:        0,
      request_digest: "abc".into(),
      degraded:       false,
    },
    replaces,
    created_at: at(10, 8),
  }
}

#[tokio::test]
async fn meals_round_trip_with_status() {
  let s = store().await;
  let m = meal("Pilav", None);
  s.save_meals(std::slice::from_ref(&m)).await.unwrap();

  let got = s.get_meal(m.meal_id).await.unwrap().unwrap();
  assert_eq!(got, m);

  let listed = s.list_meals("ada", m.date).await.unwrap();
  assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn save_meals_is_all_or_nothing() {
  let s = store().await;
  let first = meal("A", None);
  let mut dup = meal("B", None);
  dup.meal_id = first.meal_id;

  assert!(s.save_meals(&[first.clone(), dup]).await.is_err());
  assert!(s.get_meal(first.meal_id).await.unwrap().is_none());
}

#[tokio::test]
async fn swap_keeps_the_original() {
  let s = store().await;
  let original = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&original)).await.unwrap();

  let replacement = meal("Mercimek", Some(original.meal_id));
  s.save_meals(std::slice::from_ref(&replacement)).await.unwrap();
  let tr = s
    .transition_meal(original.meal_id, MealStatus::Swapped, Some(replacement.meal_id))
    .await
    .unwrap();
  assert_eq!(tr.replacement_id, Some(replacement.meal_id));

  let old = s.get_meal(original.meal_id).await.unwrap().unwrap();
  assert_eq!(old.status, MealStatus::Swapped);

  let day = s.list_meals("ada", original.date).await.unwrap();
  assert_eq!(day.len(), 2);
  assert_eq!(day[1].replaces, Some(original.meal_id));
  assert_eq!(day[1].status, MealStatus::Proposed);
}

#[tokio::test]
async fn swap_meal_writes_replacement_and_transition_together() {
  let s = store().await;
  let original = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&original)).await.unwrap();

  let replacement = meal("Mercimek", Some(original.meal_id));
  let tr = s.swap_meal(original.meal_id, &replacement).await.unwrap();
  assert_eq!(tr.status, MealStatus::Swapped);
  assert_eq!(tr.replacement_id, Some(replacement.meal_id));

  let day = s.list_meals("ada", original.date).await.unwrap();
  assert_eq!(day.len(), 2);
  assert_eq!(day[0].status, MealStatus::Swapped);
  assert_eq!(day[1].meal_id, replacement.meal_id);
}

#[tokio::test]
async fn swap_of_transitioned_meal_leaves_no_orphan() {
  let s = store().await;
  let original = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&original)).await.unwrap();
  s.transition_meal(original.meal_id, MealStatus::Accepted, None).await.unwrap();

  let replacement = meal("Mercimek", Some(original.meal_id));
  let err = s.swap_meal(original.meal_id, &replacement).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    macrocoach_core::Error::MealAlreadyTransitioned(_, MealStatus::Accepted)
  ));

  assert!(s.get_meal(replacement.meal_id).await.unwrap().is_none());
  assert_eq!(s.list_meals("ada", original.date).await.unwrap().len(), 1);
}

#[tokio::test]
async fn swap_of_unknown_meal_leaves_no_orphan() {
  let s = store().await;
  let id = Uuid::new_v4();
  let replacement = meal("Mercimek", Some(id));

  let err = s.swap_meal(id, &replacement).await.unwrap_err();
  assert!(matches!(core_err(err), macrocoach_core::Error::MealNotFound(x) if x == id));
  assert!(s.get_meal(replacement.meal_id).await.unwrap().is_none());
}

#[tokio::test]
async fn swap_requires_replaces_to_name_the_original() {
  let s = store().await;
  let original = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&original)).await.unwrap();

  let stray = meal("Mercimek", None);
  let err = s.swap_meal(original.meal_id, &stray).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    macrocoach_core::Error::Validation { field: "replaces", .. }
  ));
  assert_eq!(s.get_meal(original.meal_id).await.unwrap().unwrap().status, MealStatus::Proposed);
}

#[tokio::test]
async fn second_transition_is_rejected() {
  let s = store().await;
  let m = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&m)).await.unwrap();
  s.transition_meal(m.meal_id, MealStatus::Accepted, None).await.unwrap();

  let err = s
    .transition_meal(m.meal_id, MealStatus::Swapped, None)
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(err),
    macrocoach_core::Error::MealAlreadyTransitioned(_, MealStatus::Accepted)
  ));
}

#[tokio::test]
async fn transition_of_unknown_meal_fails() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.transition_meal(id, MealStatus::Accepted, None).await.unwrap_err();
  assert!(matches!(core_err(err), macrocoach_core::Error::MealNotFound(x) if x == id));
}

#[tokio::test]
async fn transition_back_to_proposed_is_rejected() {
  let s = store().await;
  let m = meal("Menemen", None);
  s.save_meals(std::slice::from_ref(&m)).await.unwrap();
  let err = s
    .transition_meal(m.meal_id, MealStatus::Proposed, None)
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), macrocoach_core::Error::InvalidTransition(_)));
}

// ─── Chat ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recent_turns_newest_first() {
  let s = store().await;
  for i in 0..3 {
    s.record_turn(NewTurn {
      user_id: "ada".into(),
      message: format!("msg {i}"),
      reply:   "ok".into(),
      command: "text".into(),
    })
    .await
    .unwrap();
  }

  let turns = s.recent_turns("ada", 2).await.unwrap();
  assert_eq!(turns.len(), 2);
  assert_eq!(turns[0].message, "msg 2");
  assert_eq!(turns[1].message, "msg 1");
}
