//! [`CoachSession`]: one chat turn in, one reply out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use macrocoach_core::{
  generate::MealGenerator,
  meal::{MealStatus, MealSuggestion},
  metric::MetricSample,
  planner::EnergyPlanner,
  profile::UserProfile,
  progress::ProgressSummary,
  store::{CoachStore, StoredTarget},
  turn::NewTurn,
};
use macrocoach_mealgen::{MealRequest, MealSuggestionService};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  command::Command,
  error::{Result, SessionError},
  format, payload,
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// How far back `/status` and `/plan` look for metrics.
  pub window_days:     u32,
  /// Cuisine asked for when `/plan` names none.
  pub default_cuisine: Option<String>,
}

impl Default for SessionConfig {
  fn default() -> Self { Self { window_days: 7, default_cuisine: None } }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Everything `/status` shows, also served as JSON by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
  pub user_id:      String,
  pub as_of:        DateTime<Utc>,
  pub window_days:  u32,
  pub profile:      Option<UserProfile>,
  pub target:       Option<StoredTarget>,
  pub metric_count: usize,
  pub progress:     Option<ProgressSummary>,
  /// Newest first.
  #[serde(skip)]
  pub metrics:      Vec<MetricSample>,
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct CoachSession<S, G> {
  store:   Arc<S>,
  planner: EnergyPlanner,
  meals:   MealSuggestionService<G>,
  config:  SessionConfig,
}

impl<S: CoachStore, G: MealGenerator> CoachSession<S, G> {
  pub fn new(
    store: Arc<S>,
    planner: EnergyPlanner,
    meals: MealSuggestionService<G>,
    config: SessionConfig,
  ) -> Self {
    Self { store, planner, meals, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn planner(&self) -> &EnergyPlanner { &self.planner }

  pub fn meals(&self) -> &MealSuggestionService<G> { &self.meals }

  pub fn config(&self) -> &SessionConfig { &self.config }

  /// Answer `message` for `user_id`. Never fails: errors become reply text.
  pub async fn handle_turn(&self, user_id: &str, message: &str) -> String {
    self.handle_turn_at(user_id, message, Utc::now()).await
  }

  /// [`handle_turn`](Self::handle_turn) with an explicit clock reading.
  pub async fn handle_turn_at(&self, user_id: &str, message: &str, now: DateTime<Utc>) -> String {
    let command = Command::parse(message);
    let tag = command.tag();

    let reply = match self.dispatch(user_id, command, now).await {
      Ok(reply) => reply,
      Err(e) if e.is_user_facing() => {
        tracing::debug!(user_id, command = tag, error = %e, "command rejected");
        format::rejected(&e.to_string())
      }
      Err(e) => {
        tracing::error!(user_id, command = tag, error = %e, "command failed");
        format::APOLOGY.to_owned()
      }
    };

    let turn = NewTurn {
      user_id: user_id.to_owned(),
      message: message.to_owned(),
      reply:   reply.clone(),
      command: tag.to_owned(),
    };
    if let Err(e) = self.store.record_turn(turn).await {
      tracing::warn!(user_id, command = tag, error = %e, "failed to record chat turn");
    }

    reply
  }

  async fn dispatch(&self, user_id: &str, command: Command, now: DateTime<Utc>) -> Result<String> {
    match command {
      Command::Status => {
        let report = self.status_report(user_id, now).await?;
        Ok(format::status(
          &report.metrics,
          report.target.as_ref(),
          report.progress.as_ref(),
          report.window_days,
        ))
      }
      Command::Plan { cuisines } => self.plan(user_id, cuisines, now).await,
      Command::Add { args } => {
        let metric = payload::parse_metric(user_id, &args, now)?;
        let sample = self.store.save_metric(metric).await.map_err(SessionError::store)?;
        tracing::info!(user_id, sample_id = %sample.sample_id, "metric logged");
        Ok(format::logged(&sample))
      }
      Command::Swap { meal_id } => self.swap(user_id, &meal_id).await,
      Command::Accept { meal_id } => {
        let meal = self.proposed_meal(user_id, &meal_id).await?;
        self
          .store
          .transition_meal(meal.meal_id, MealStatus::Accepted, None)
          .await
          .map_err(SessionError::store)?;
        Ok(format::accepted(&meal))
      }
      Command::Profile { args } => self.profile(user_id, &args).await,
      Command::Help | Command::Text => Ok(format::HELP.to_owned()),
      Command::Unknown { name } => Ok(format::unknown(&name)),
    }
  }

  /// Profile, current target, metrics in the window and a progress summary.
  pub async fn status_report(&self, user_id: &str, as_of: DateTime<Utc>) -> Result<StatusReport> {
    let window_days = self.config.window_days;
    let metrics = self
      .store
      .get_latest_metrics(user_id, window_days, as_of)
      .await
      .map_err(SessionError::store)?;
    let target = self.store.latest_target(user_id).await.map_err(SessionError::store)?;
    let profile = self.store.get_profile(user_id).await.map_err(SessionError::store)?;

    Ok(StatusReport {
      user_id: user_id.to_owned(),
      as_of,
      window_days,
      profile,
      target,
      metric_count: metrics.len(),
      progress: ProgressSummary::from_metrics(&metrics),
      metrics,
    })
  }

  // ── /plan ────────────────────────────────────────────────────────────

  async fn plan(&self, user_id: &str, cuisines: Vec<String>, now: DateTime<Utc>) -> Result<String> {
    let Some(profile) = self.store.get_profile(user_id).await.map_err(SessionError::store)? else {
      return Ok(format::ONBOARDING.to_owned());
    };

    let metrics = self
      .store
      .get_latest_metrics(user_id, self.config.window_days, now)
      .await
      .map_err(SessionError::store)?;
    let target = self.planner.compute_targets(&profile, &metrics, now.date_naive());
    let stored = self.store.save_target(target).await.map_err(SessionError::store)?;

    let cuisine_tags = if cuisines.is_empty() {
      self.config.default_cuisine.iter().cloned().collect()
    } else {
      cuisines
    };
    let request = MealRequest {
      count: self.meals.config().meals_per_day,
      cuisine_tags,
      dietary_tags: profile.dietary_preferences.iter().cloned().collect(),
      avoid: Vec::new(),
    };
    let meals = self.meals.suggest(&stored.target, &request).await?;
    self.store.save_meals(&meals).await.map_err(SessionError::store)?;

    tracing::info!(
      user_id,
      kcal = stored.target.kcal_target,
      meals = meals.len(),
      low_confidence = meals.iter().filter(|m| m.low_confidence).count(),
      "plan created"
    );
    Ok(format::plan(&stored.target, &meals))
  }

  // ── /swap, /accept ───────────────────────────────────────────────────

  /// Look up a meal of `user_id` that can still change status.
  async fn proposed_meal(&self, user_id: &str, raw_id: &str) -> Result<MealSuggestion> {
    let meal_id = Uuid::parse_str(raw_id)
      .map_err(|_| macrocoach_core::Error::validation("meal_id", format!("`{raw_id}` is not a meal id")))?;
    let meal = self
      .store
      .get_meal(meal_id)
      .await
      .map_err(SessionError::store)?
      .filter(|m| m.user_id == user_id)
      .ok_or(macrocoach_core::Error::MealNotFound(meal_id))?;
    if meal.status != MealStatus::Proposed {
      return Err(macrocoach_core::Error::MealAlreadyTransitioned(meal_id, meal.status).into());
    }
    Ok(meal)
  }

  async fn swap(&self, user_id: &str, raw_id: &str) -> Result<String> {
    let original = self.proposed_meal(user_id, raw_id).await?;

    let target = self
      .store
      .target_for_date(user_id, original.date)
      .await
      .map_err(SessionError::store)?
      .map(|t| t.target);
    let dietary_tags: Vec<String> = self
      .store
      .get_profile(user_id)
      .await
      .map_err(SessionError::store)?
      .map(|p| p.dietary_preferences.into_iter().collect())
      .unwrap_or_default();

    let replacement = self.meals.replace_meal(&original, target.as_ref(), &dietary_tags).await?;
    self
      .store
      .swap_meal(original.meal_id, &replacement)
      .await
      .map_err(SessionError::store)?;

    tracing::info!(
      user_id,
      original = %original.meal_id,
      replacement = %replacement.meal_id,
      "meal swapped"
    );
    Ok(format::swapped(&original, &replacement))
  }

  // ── /profile ─────────────────────────────────────────────────────────

  async fn profile(&self, user_id: &str, args: &[String]) -> Result<String> {
    let current = self.store.get_profile(user_id).await.map_err(SessionError::store)?;
    if args.is_empty() {
      return Ok(match current {
        Some(p) => format::profile(&p),
        None => format::ONBOARDING.to_owned(),
      });
    }

    let input = payload::parse_profile(user_id, args, current.as_ref())?;
    let saved = self.store.save_profile(input).await.map_err(SessionError::store)?;
    tracing::info!(user_id, version = saved.version, "profile saved");
    Ok(format!("Saved.\n\n{}", format::profile(&saved)))
  }
}

#[cfg(test)]
mod tests;
