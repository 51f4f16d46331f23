//! `CoachSession` against an in-memory SQLite store and the pantry generator.

use std::{
  convert::Infallible,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use macrocoach_core::{
  generate::{GenerationRequest, MealCandidate, MealGenerator},
  meal::MealStatus,
  planner::EnergyPlanner,
  store::CoachStore,
  target::Macros,
};
use macrocoach_mealgen::{MealServiceConfig, MealSuggestionService, PantryGenerator};
use macrocoach_store_sqlite::SqliteStore;

use super::*;
use crate::format;

type Session = CoachSession<SqliteStore, PantryGenerator>;

async fn session() -> Session {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  CoachSession::new(
    store,
    EnergyPlanner::default(),
    MealSuggestionService::new(PantryGenerator::new(), MealServiceConfig::default()),
    SessionConfig::default(),
  )
}

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap() }

const PROFILE: &str =
  "/profile sex=male age=30 height=180 weight=80 activity=sedentary goal=maintain";

async fn planned(s: &Session) -> Vec<MealSuggestion> {
  s.handle_turn_at("ada", PROFILE, now()).await;
  s.handle_turn_at("ada", "/plan", now()).await;
  s.store().list_meals("ada", now().date_naive()).await.unwrap()
}

// ─── Help ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn free_text_gets_help() {
  let s = session().await;
  assert_eq!(s.handle_turn_at("ada", "what should I eat?", now()).await, format::HELP);
  assert_eq!(s.handle_turn_at("ada", "/help", now()).await, format::HELP);
}

#[tokio::test]
async fn unknown_command_is_named() {
  let s = session().await;
  let reply = s.handle_turn_at("ada", "/dance", now()).await;
  assert!(reply.starts_with("Unknown command /dance."));
  assert!(reply.contains("/plan"));
}

// ─── /add and /status ────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_heart_rate_never_reaches_status() {
  let s = session().await;

  let reply = s.handle_turn_at("ada", "/add hr=400", now()).await;
  assert!(reply.contains("heart_rate"), "{reply}");
  assert!(
    s.store().get_latest_metrics("ada", 7, now()).await.unwrap().is_empty()
  );
  assert_eq!(s.handle_turn_at("ada", "/status", now()).await, format::NO_DATA);

  let reply = s.handle_turn_at("ada", "/add hr=61 steps=4200", now()).await;
  assert!(reply.starts_with("Logged"), "{reply}");

  let status = s.handle_turn_at("ada", "/status", now()).await;
  assert!(status.contains("heart rate  61 bpm"), "{status}");
  assert!(!status.contains("400"));
}

#[tokio::test]
async fn add_with_partial_garbage_writes_nothing() {
  let s = session().await;
  let reply = s.handle_turn_at("ada", "/add steps=9000 mood=great", now()).await;
  assert!(reply.starts_with("Could not do that"), "{reply}");
  assert!(
    s.store().get_latest_metrics("ada", 7, now()).await.unwrap().is_empty()
  );
}

#[tokio::test]
async fn status_report_counts_window() {
  let s = session().await;
  s.handle_turn_at("ada", "/add weight=80 at=2024-06-01", now()).await;
  s.handle_turn_at("ada", "/add weight=79.5 at=2024-06-08", now()).await;
  s.handle_turn_at("ada", "/add weight=79 at=2024-06-09", now()).await;

  let report = s.status_report("ada", now()).await.unwrap();
  // 2024-06-01 is outside the seven-day window.
  assert_eq!(report.metric_count, 2);
  assert_eq!(report.progress.unwrap().days, 2);
  assert!(report.profile.is_none());
}

// ─── /profile and /plan ──────────────────────────────────────────────────────

#[tokio::test]
async fn plan_without_profile_onboards() {
  let s = session().await;
  assert_eq!(s.handle_turn_at("ada", "/plan", now()).await, format::ONBOARDING);
  assert!(s.store().latest_target("ada").await.unwrap().is_none());
}

#[tokio::test]
async fn profile_versions_through_chat() {
  let s = session().await;
  assert_eq!(s.handle_turn_at("ada", "/profile", now()).await, format::ONBOARDING);

  let reply = s.handle_turn_at("ada", PROFILE, now()).await;
  assert!(reply.contains("version 1"), "{reply}");
  let reply = s.handle_turn_at("ada", "/profile weight=78", now()).await;
  assert!(reply.contains("version 2"), "{reply}");

  let p = s.store().get_profile("ada").await.unwrap().unwrap();
  assert_eq!(p.weight_kg, 78.0);
  assert_eq!(p.age, 30);

  let reply = s.handle_turn_at("ada", "/profile age=0", now()).await;
  assert!(reply.contains("age"), "{reply}");
  assert_eq!(s.store().profile_history("ada").await.unwrap().len(), 2);
}

#[tokio::test]
async fn plan_persists_target_and_meals() {
  let s = session().await;
  s.handle_turn_at("ada", PROFILE, now()).await;

  let reply = s.handle_turn_at("ada", "/plan", now()).await;
  assert!(reply.contains("2136 kcal"), "{reply}");
  assert!(reply.contains("move 6000 steps, train 30 min"), "{reply}");

  let target = s.store().latest_target("ada").await.unwrap().unwrap().target;
  assert_eq!(target.date, now().date_naive());
  assert_eq!(target.target_steps, 6_000);
  assert!((target.kcal_target - 2136.0).abs() < 1.0);

  let meals = s.store().list_meals("ada", now().date_naive()).await.unwrap();
  assert_eq!(meals.len(), 3);
  assert!(meals.iter().all(|m| m.status == MealStatus::Proposed));
  let total: f64 = meals.iter().map(|m| m.macros.kcal).sum();
  assert!((total - target.kcal_target).abs() < 1.0);
}

// ─── /swap and /accept ───────────────────────────────────────────────────────

/// Always answers 1500 kcal per meal and records each requested envelope.
#[derive(Default)]
struct OffTarget {
  envelopes: Mutex<Vec<Macros>>,
}

impl OffTarget {
  fn last_envelope(&self) -> Macros {
    *self.envelopes.lock().unwrap().last().expect("at least one request")
  }
}

impl MealGenerator for OffTarget {
  type Error = Infallible;

  fn name(&self) -> &str { "off-target" }

  async fn generate(&self, request: &GenerationRequest) -> Result<Vec<MealCandidate>, Infallible> {
    self.envelopes.lock().unwrap().push(request.envelope);
    Ok(
      request
        .meal_types
        .iter()
        .map(|&meal_type| MealCandidate {
          name: format!("Heavy {meal_type}"),
          meal_type,
          macros: Macros { kcal: 1500.0, protein_g: 60.0, carbs_g: 150.0, fat_g: 70.0 },
          cuisine: None,
          ingredients: vec![],
          instructions: vec![],
        })
        .collect(),
    )
  }
}

#[tokio::test]
async fn swap_uses_the_target_of_the_meals_day() {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  let s = CoachSession::new(
    store,
    EnergyPlanner::default(),
    MealSuggestionService::new(OffTarget::default(), MealServiceConfig::default()),
    SessionConfig::default(),
  );
  let tomorrow = now() + Duration::days(1);

  s.handle_turn_at("ada", PROFILE, now()).await;
  s.handle_turn_at("ada", "/plan", now()).await;
  s.handle_turn_at("ada", "/profile weight=100", tomorrow).await;
  s.handle_turn_at("ada", "/plan", tomorrow).await;

  let day_target = s
    .store()
    .target_for_date("ada", now().date_naive())
    .await
    .unwrap()
    .unwrap()
    .target;
  let next_target = s.store().latest_target("ada").await.unwrap().unwrap().target;
  assert_ne!(day_target.kcal_target, next_target.kcal_target);

  let original = s.store().list_meals("ada", now().date_naive()).await.unwrap().remove(0);
  assert!(original.low_confidence);

  let reply = s
    .handle_turn_at("ada", &format!("/swap {}", original.meal_id), tomorrow)
    .await;
  assert!(reply.starts_with("Swapped out"), "{reply}");

  let expected = s.meals().meal_envelope(&day_target);
  let used = s.meals().generator().last_envelope();
  assert!((used.kcal - expected.kcal).abs() < 1e-6, "{used:?} vs {expected:?}");
  assert!((used.kcal - original.macros.kcal).abs() > 1.0);
}

#[tokio::test]
async fn swap_keeps_the_original() {
  let s = session().await;
  let meals = planned(&s).await;
  let original = &meals[1];

  let reply = s
    .handle_turn_at("ada", &format!("/swap {}", original.meal_id), now())
    .await;
  assert!(reply.starts_with("Swapped out"), "{reply}");

  let kept = s.store().get_meal(original.meal_id).await.unwrap().unwrap();
  assert_eq!(kept.status, MealStatus::Swapped);
  assert_eq!(kept.name, original.name);

  let all = s.store().list_meals("ada", now().date_naive()).await.unwrap();
  assert_eq!(all.len(), 4);
  let replacement = all
    .iter()
    .find(|m| m.replaces == Some(original.meal_id))
    .expect("replacement stored");
  assert_eq!(replacement.meal_type, original.meal_type);
  assert_eq!(replacement.status, MealStatus::Proposed);

  let again = s
    .handle_turn_at("ada", &format!("/swap {}", original.meal_id), now())
    .await;
  assert!(again.contains("already swapped"), "{again}");
  assert_eq!(s.store().list_meals("ada", now().date_naive()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn accept_marks_meal() {
  let s = session().await;
  let meals = planned(&s).await;

  let reply = s
    .handle_turn_at("ada", &format!("/accept {}", meals[0].meal_id), now())
    .await;
  assert!(reply.starts_with("Marked"), "{reply}");
  let meal = s.store().get_meal(meals[0].meal_id).await.unwrap().unwrap();
  assert_eq!(meal.status, MealStatus::Accepted);
}

#[tokio::test]
async fn meals_of_other_users_are_not_found() {
  let s = session().await;
  let meals = planned(&s).await;

  let reply = s
    .handle_turn_at("grace", &format!("/swap {}", meals[0].meal_id), now())
    .await;
  assert!(reply.contains("not found"), "{reply}");

  let reply = s.handle_turn_at("ada", "/swap not-a-uuid", now()).await;
  assert!(reply.contains("not a meal id"), "{reply}");
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_turn_is_recorded() {
  let s = session().await;
  s.handle_turn_at("ada", "hello", now()).await;
  s.handle_turn_at("ada", "/add hr=400", now()).await;
  s.handle_turn_at("ada", "/status", now()).await;

  let turns = s.store().recent_turns("ada", 10).await.unwrap();
  let tags: Vec<&str> = turns.iter().map(|t| t.command.as_str()).collect();
  assert_eq!(tags, ["status", "add", "text"]);
  assert_eq!(turns[1].message, "/add hr=400");
  assert!(turns[1].reply.contains("heart_rate"));
}
