use std::{
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use chrono::NaiveDate;
use macrocoach_core::{
  generate::{GenerationRequest, MealCandidate, MealGenerator},
  meal::MealType,
  target::{MacroTarget, Macros},
};

use super::*;

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
struct Unavailable;

/// Generator driven by a closure of `(request, call index)`. Records every
/// request it receives.
struct Scripted<F> {
  script:   F,
  calls:    AtomicUsize,
  requests: Mutex<Vec<GenerationRequest>>,
  delay:    Option<Duration>,
}

impl<F> Scripted<F>
where
  F: Fn(&GenerationRequest, usize) -> Result<Vec<MealCandidate>, Unavailable> + Send + Sync,
{
  fn new(script: F) -> Self {
    Self { script, calls: AtomicUsize::new(0), requests: Mutex::new(Vec::new()), delay: None }
  }

  fn slow(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  fn request(&self, i: usize) -> GenerationRequest { self.requests.lock().unwrap()[i].clone() }
}

impl<F> MealGenerator for Scripted<F>
where
  F: Fn(&GenerationRequest, usize) -> Result<Vec<MealCandidate>, Unavailable> + Send + Sync,
{
  type Error = Unavailable;

  fn name(&self) -> &str { "scripted" }

  async fn generate(&self, request: &GenerationRequest) -> Result<Vec<MealCandidate>, Unavailable> {
    let n = self.calls.fetch_add(1, Ordering::SeqCst);
    self.requests.lock().unwrap().push(request.clone());
    if let Some(d) = self.delay {
      tokio::time::sleep(d).await;
    }
    (self.script)(request, n)
  }
}

fn target() -> MacroTarget {
  MacroTarget {
    user_id:           "ada".into(),
    date:              NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
    kcal_target:       2100.0,
    protein_g_target:  150.0,
    carbs_g_target:    220.0,
    fat_g_target:      58.0,
    bmr:               1700.0,
    tdee:              2100.0,
    observed_kcal_out: None,
    target_steps:           10_000,
    target_workout_minutes: 30,
  }
}

fn candidate(meal_type: MealType, kcal: f64) -> MealCandidate {
  MealCandidate {
    name: format!("{meal_type} at {kcal}"),
    meal_type,
    macros: Macros { kcal, protein_g: 40.0, carbs_g: 70.0, fat_g: 20.0 },
    cuisine: Some("turkish".into()),
    ingredients: vec![],
    instructions: vec![],
  }
}

/// One candidate per requested type, all at `kcal`.
fn all_at(kcal: f64) -> impl Fn(&GenerationRequest, usize) -> Result<Vec<MealCandidate>, Unavailable> {
  move |req: &GenerationRequest, _: usize| Ok(req.meal_types.iter().map(|&t| candidate(t, kcal)).collect())
}

fn service<G: MealGenerator>(g: G) -> MealSuggestionService<G> {
  MealSuggestionService::new(g, MealServiceConfig::default())
}

// ─── Count ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_count_is_a_validation_error() {
  let svc = service(Scripted::new(all_at(700.0)));
  let err = svc.suggest_meals(&target(), &[], 0).await.unwrap_err();
  assert!(matches!(err, GenerationError::Validation(e) if e.is_validation()));
  assert_eq!(svc.generator().calls(), 0);
}

#[tokio::test]
async fn valid_first_attempt_needs_one_call() {
  let svc = service(Scripted::new(all_at(700.0)));
  let meals = svc.suggest_meals(&target(), &["turkish".into()], 3).await.unwrap();

  assert_eq!(meals.len(), 3);
  assert_eq!(svc.generator().calls(), 1);
  assert!(meals.iter().all(|m| !m.low_confidence && !m.provenance.degraded));
  assert!(meals.iter().all(|m| m.provenance.attempt == 0));
  assert_eq!(meals[0].meal_type, MealType::Breakfast);
  assert_eq!(meals[2].meal_type, MealType::Dinner);
  assert_eq!(svc.generator().request(0).envelope.kcal, 700.0);
}

#[tokio::test]
async fn within_ten_percent_is_accepted() {
  let svc = service(Scripted::new(all_at(765.0)));
  let meals = svc.suggest_meals(&target(), &[], 3).await.unwrap();
  assert!(meals.iter().all(|m| !m.low_confidence));
}

// ─── Retries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_attempt_off_target_gives_low_confidence() {
  let svc = service(Scripted::new(all_at(1400.0)));
  let meals = svc.suggest_meals(&target(), &[], 3).await.unwrap();

  assert_eq!(meals.len(), 3);
  // Attempt 0 plus two regenerations.
  assert_eq!(svc.generator().calls(), 3);
  assert!(meals.iter().all(|m| m.low_confidence));
  assert!(meals.iter().all(|m| !m.provenance.degraded));
}

#[tokio::test]
async fn regeneration_asks_only_for_missing_slots() {
  let script = |req: &GenerationRequest, n: usize| -> Result<Vec<MealCandidate>, Unavailable> {
    Ok(
      req
        .meal_types
        .iter()
        .map(|&t| {
          // First call: only lunch is on target.
          let kcal = if n == 0 && t != MealType::Lunch { 1500.0 } else { 690.0 };
          candidate(t, kcal)
        })
        .collect(),
    )
  };
  let svc = service(Scripted::new(script));
  let meals = svc.suggest_meals(&target(), &[], 3).await.unwrap();

  assert_eq!(svc.generator().calls(), 2);
  assert_eq!(
    svc.generator().request(1).meal_types,
    vec![MealType::Breakfast, MealType::Dinner]
  );
  assert!(meals.iter().all(|m| !m.low_confidence));
  assert_eq!(meals[1].provenance.attempt, 0);
  assert_eq!(meals[0].provenance.attempt, 1);
}

#[tokio::test]
async fn closest_invalid_candidate_is_kept() {
  let script = |req: &GenerationRequest, n: usize| -> Result<Vec<MealCandidate>, Unavailable> {
    let kcal = [1000.0, 800.0, 1200.0][n];
    Ok(req.meal_types.iter().map(|&t| candidate(t, kcal)).collect())
  };
  let svc = service(Scripted::new(script));
  let meals = svc.suggest_meals(&target(), &[], 1).await.unwrap();

  assert_eq!(meals.len(), 1);
  assert!(meals[0].low_confidence);
  assert_eq!(meals[0].macros.kcal, 800.0);
  assert_eq!(meals[0].provenance.attempt, 1);
}

#[tokio::test]
async fn short_answers_are_topped_up() {
  // The generator only ever answers with a single meal.
  let script = |req: &GenerationRequest, _: usize| -> Result<Vec<MealCandidate>, Unavailable> {
    Ok(vec![candidate(req.meal_types[0], 700.0)])
  };
  let svc = service(Scripted::new(script));
  let meals = svc.suggest_meals(&target(), &[], 3).await.unwrap();

  assert_eq!(meals.len(), 3);
  assert_eq!(svc.generator().calls(), 3);
  assert!(meals.iter().all(|m| !m.low_confidence));
}

// ─── Degradation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn failing_generator_degrades_to_pantry() {
  let svc = service(Scripted::new(|_: &GenerationRequest, _: usize| Err(Unavailable)));
  let meals = svc.suggest_meals(&target(), &[], 3).await.unwrap();

  assert_eq!(meals.len(), 3);
  assert_eq!(svc.generator().calls(), 3);
  for m in &meals {
    assert!(!m.low_confidence);
    assert!(m.provenance.degraded);
    assert_eq!(m.provenance.generator, PantryGenerator::NAME);
    assert!((m.macros.kcal - 700.0).abs() < 1e-6);
  }
}

#[tokio::test(start_paused = true)]
async fn slow_generator_times_out_and_degrades() {
  let g = Scripted::new(all_at(700.0)).slow(Duration::from_secs(120));
  let svc = service(g);
  let meals = svc.suggest_meals(&target(), &[], 2).await.unwrap();

  assert_eq!(meals.len(), 2);
  assert_eq!(svc.generator().calls(), 3);
  assert!(meals.iter().all(|m| m.provenance.degraded));
  assert!(meals.iter().all(|m| !m.low_confidence));
}

// ─── Provenance ──────────────────────────────────────────────────────────────

#[test]
fn digest_is_stable_and_input_sensitive() {
  let req = GenerationRequest {
    envelope:     Macros { kcal: 700.0, ..Default::default() },
    meal_types:   vec![MealType::Lunch],
    cuisine_tags: vec![],
    dietary_tags: vec![],
    avoid:        vec![],
  };
  let mut other = req.clone();
  other.cuisine_tags.push("italian".into());

  assert_eq!(request_digest(&req), request_digest(&req));
  assert_eq!(request_digest(&req).len(), 64);
  assert_ne!(request_digest(&req), request_digest(&other));
}

#[tokio::test]
async fn provenance_records_generator_and_digest() {
  let svc = service(Scripted::new(all_at(700.0)));
  let meals = svc.suggest_meals(&target(), &[], 2).await.unwrap();
  let expected = request_digest(&svc.generator().request(0));
  for m in &meals {
    assert_eq!(m.provenance.generator, "scripted");
    assert_eq!(m.provenance.request_digest, expected);
  }
}

// ─── Replacement ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn replacement_keeps_type_and_avoids_original() {
  let svc = service(Scripted::new(all_at(700.0)));
  let original = svc.suggest_meals(&target(), &[], 2).await.unwrap().remove(1);

  let replacement = svc.replace_meal(&original, Some(&target()), &[]).await.unwrap();

  assert_eq!(replacement.meal_type, MealType::Lunch);
  assert_eq!(replacement.replaces, Some(original.meal_id));
  assert_ne!(replacement.meal_id, original.meal_id);
  let req = svc.generator().request(1);
  assert_eq!(req.meal_types, vec![MealType::Lunch]);
  assert_eq!(req.avoid, vec![original.name.clone()]);
  assert_eq!(req.envelope.kcal, 700.0);
}
