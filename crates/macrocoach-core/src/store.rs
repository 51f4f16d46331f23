//! The `CoachStore` trait.
//!
//! Implemented by storage backends (e.g. `macrocoach-store-sqlite`). The
//! session, the API and the server depend on this abstraction only.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  error::AsCoreError,
  meal::{MealStatus, MealSuggestion, MealTransition},
  metric::{MetricSample, NewMetric},
  profile::{NewProfile, UserProfile},
  target::MacroTarget,
  turn::{ChatTurn, NewTurn},
};

/// A persisted target together with the time the store accepted it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredTarget {
  #[serde(flatten)]
  pub target:      MacroTarget,
  pub computed_at: DateTime<Utc>,
}

/// Abstraction over a MacroCoach store backend.
///
/// Metrics, targets, meals and chat turns are append-only. Profile edits
/// produce new versions; meal status changes are recorded as transitions
/// next to the original meal.
///
/// All methods return `Send` futures so the trait can be used behind `axum`.
pub trait CoachStore: Send + Sync {
  type Error: std::error::Error + AsCoreError + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Validate and persist `input` as the next version of the user's profile.
  fn save_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + '_;

  /// The latest profile version, or `None` before onboarding.
  fn get_profile<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<UserProfile>, Self::Error>> + Send + 'a;

  /// Every profile version, newest first.
  fn profile_history<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<UserProfile>, Self::Error>> + Send + 'a;

  // ── Metrics ───────────────────────────────────────────────────────────

  /// Validate and append a sample. `sample_id` and `recorded_at` are
  /// assigned by the store.
  fn save_metric(
    &self,
    input: NewMetric,
  ) -> impl Future<Output = Result<MetricSample, Self::Error>> + Send + '_;

  /// Samples with `as_of - window_days <= timestamp <= as_of`, newest
  /// first. When several samples share a timestamp only the one written
  /// last is returned.
  fn get_latest_metrics<'a>(
    &'a self,
    user_id: &'a str,
    window_days: u32,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<MetricSample>, Self::Error>> + Send + 'a;

  // ── Targets ───────────────────────────────────────────────────────────

  fn save_target(
    &self,
    target: MacroTarget,
  ) -> impl Future<Output = Result<StoredTarget, Self::Error>> + Send + '_;

  /// The most recently computed target.
  fn latest_target<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Option<StoredTarget>, Self::Error>> + Send + 'a;

  /// Up to `limit` targets, newest first.
  fn target_history<'a>(
    &'a self,
    user_id: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<StoredTarget>, Self::Error>> + Send + 'a;

  /// The most recent target computed for `date`, if any.
  fn target_for_date<'a>(
    &'a self,
    user_id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Option<StoredTarget>, Self::Error>> + Send + 'a;

  // ── Meals ─────────────────────────────────────────────────────────────

  /// Persist a batch of suggestions in one transaction. Either every meal is
  /// written or none is.
  fn save_meals<'a>(
    &'a self,
    meals: &'a [MealSuggestion],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// A meal with its current status resolved.
  fn get_meal(
    &self,
    meal_id: Uuid,
  ) -> impl Future<Output = Result<Option<MealSuggestion>, Self::Error>> + Send + '_;

  /// Every meal planned for `date`, swapped ones included.
  fn list_meals<'a>(
    &'a self,
    user_id: &'a str,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<MealSuggestion>, Self::Error>> + Send + 'a;

  /// Record a status change for a `proposed` meal.
  ///
  /// Returns an error if the meal does not exist, if it has already been
  /// accepted or swapped, or if `status` is `Proposed`.
  fn transition_meal(
    &self,
    meal_id: Uuid,
    status: MealStatus,
    replacement_id: Option<Uuid>,
  ) -> impl Future<Output = Result<MealTransition, Self::Error>> + Send + '_;

  /// Store `replacement` and mark `original_id` as swapped for it, in one
  /// transaction. `replacement.replaces` must name `original_id`. Fails like
  /// [`transition_meal`](Self::transition_meal), and then nothing is written.
  fn swap_meal<'a>(
    &'a self,
    original_id: Uuid,
    replacement: &'a MealSuggestion,
  ) -> impl Future<Output = Result<MealTransition, Self::Error>> + Send + 'a;

  // ── Chat ──────────────────────────────────────────────────────────────

  fn record_turn(
    &self,
    input: NewTurn,
  ) -> impl Future<Output = Result<ChatTurn, Self::Error>> + Send + '_;

  /// Up to `limit` turns, newest first.
  fn recent_turns<'a>(
    &'a self,
    user_id: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ChatTurn>, Self::Error>> + Send + 'a;
}
