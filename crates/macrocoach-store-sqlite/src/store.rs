//! [`SqliteStore`]: the SQLite implementation of [`CoachStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use macrocoach_core::{
  meal::{MealStatus, MealSuggestion, MealTransition},
  metric::{MetricSample, NewMetric},
  profile::{NewProfile, UserProfile},
  store::{CoachStore, StoredTarget},
  target::MacroTarget,
  turn::{ChatTurn, NewTurn},
};

use crate::{
  encode::{
    encode_date, encode_dt, encode_uuid, RawMeal, RawMetric, RawProfile, RawTarget,
    RawTransition, RawTurn, MEAL_COLUMNS, METRIC_COLUMNS, PROFILE_COLUMNS, TARGET_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A MacroCoach store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// A meal flattened to owned column values, ready to move into a
/// `Connection::call` closure.
struct MealRow {
  meal_id:        String,
  user_id:        String,
  date:           String,
  name:           String,
  meal_type:      String,
  kcal:           f64,
  protein_g:      f64,
  carbs_g:        f64,
  fat_g:          f64,
  cuisine:        Option<String>,
  ingredients:    String,
  instructions:   String,
  low_confidence: bool,
  provenance:     String,
  replaces:       Option<String>,
  created_at:     String,
}

impl MealRow {
  fn encode(meal: &MealSuggestion) -> Result<Self> {
    Ok(Self {
      meal_id:        encode_uuid(meal.meal_id),
      user_id:        meal.user_id.clone(),
      date:           encode_date(meal.date),
      name:           meal.name.clone(),
      meal_type:      meal.meal_type.to_string(),
      kcal:           meal.macros.kcal,
      protein_g:      meal.macros.protein_g,
      carbs_g:        meal.macros.carbs_g,
      fat_g:          meal.macros.fat_g,
      cuisine:        meal.cuisine.clone(),
      ingredients:    serde_json::to_string(&meal.ingredients)?,
      instructions:   serde_json::to_string(&meal.instructions)?,
      low_confidence: meal.low_confidence,
      provenance:     serde_json::to_string(&meal.provenance)?,
      replaces:       meal.replaces.map(encode_uuid),
      created_at:     encode_dt(meal.created_at),
    })
  }
}

impl MealRow {
  fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn
      .prepare_cached(
        "INSERT INTO meals (
           meal_id, user_id, date, name, meal_type, kcal, protein_g, carbs_g,
           fat_g, cuisine, ingredients, instructions, low_confidence,
           provenance, replaces, created_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
      )?
      .execute(rusqlite::params![
        self.meal_id,
        self.user_id,
        self.date,
        self.name,
        self.meal_type,
        self.kcal,
        self.protein_g,
        self.carbs_g,
        self.fat_g,
        self.cuisine,
        self.ingredients,
        self.instructions,
        self.low_confidence,
        self.provenance,
        self.replaces,
        self.created_at,
      ])?;
    Ok(())
  }
}

/// Result of a check-and-insert on `meal_transitions`, run inside the
/// caller's transaction.
enum TransitionOutcome {
  Missing,
  Already(String),
  Recorded(RawTransition),
}

impl TransitionOutcome {
  /// Record `raw` unless its meal is missing or already transitioned. Does
  /// not commit.
  fn record(conn: &rusqlite::Connection, raw: RawTransition) -> rusqlite::Result<Self> {
    let exists = conn
      .query_row(
        "SELECT 1 FROM meals WHERE meal_id = ?1",
        rusqlite::params![raw.meal_id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false);
    if !exists {
      return Ok(Self::Missing);
    }

    let current: Option<String> = conn
      .query_row(
        "SELECT status FROM meal_transitions WHERE meal_id = ?1",
        rusqlite::params![raw.meal_id],
        |r| r.get(0),
      )
      .optional()?;
    if let Some(current) = current {
      return Ok(Self::Already(current));
    }

    conn.execute(
      "INSERT INTO meal_transitions (meal_id, status, replacement_id, recorded_at)
       VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![raw.meal_id, raw.status, raw.replacement_id, raw.recorded_at],
    )?;
    Ok(Self::Recorded(raw))
  }

  fn is_recorded(&self) -> bool { matches!(self, Self::Recorded(_)) }

  fn into_result(self, meal_id: Uuid) -> Result<MealTransition> {
    match self {
      Self::Missing => Err(macrocoach_core::Error::MealNotFound(meal_id).into()),
      Self::Already(current) => {
        let current = crate::encode::decode_enum("meal status", &current)?;
        Err(macrocoach_core::Error::MealAlreadyTransitioned(meal_id, current).into())
      }
      Self::Recorded(raw) => raw.into_transition(),
    }
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for tests and demos.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── CoachStore impl ─────────────────────────────────────────────────────────

impl CoachStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn save_profile(&self, input: NewProfile) -> Result<UserProfile> {
    input.validate()?;

    let recorded_at = Utc::now();
    let user_id     = input.user_id.clone();
    let sex         = input.sex.to_string();
    let activity    = input.activity_level.to_string();
    let goal        = input.goal.to_string();
    let prefs       = serde_json::to_string(&input.dietary_preferences)?;
    let at_str      = encode_dt(recorded_at);
    let (age, height_cm, weight_kg) = (input.age, input.height_cm, input.weight_kg);

    let version: u32 = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let version: u32 = tx.query_row(
          "SELECT COALESCE(MAX(version), 0) + 1 FROM profiles WHERE user_id = ?1",
          rusqlite::params![user_id],
          |r| r.get(0),
        )?;
        tx.execute(
          "INSERT INTO profiles (
             user_id, version, sex, age, height_cm, weight_kg,
             activity_level, goal, dietary_preferences, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            user_id, version, sex, age, height_cm, weight_kg, activity, goal, prefs, at_str,
          ],
        )?;
        tx.commit()?;
        Ok(version)
      })
      .await?;

    tracing::debug!(user_id = %input.user_id, version, "profile saved");

    Ok(UserProfile {
      user_id: input.user_id,
      version,
      sex: input.sex,
      age: input.age,
      height_cm: input.height_cm,
      weight_kg: input.weight_kg,
      activity_level: input.activity_level,
      goal: input.goal,
      dietary_preferences: input.dietary_preferences,
      recorded_at,
    })
  }

  async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
    let user_id = user_id.to_owned();

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1
                 ORDER BY version DESC LIMIT 1"
              ),
              rusqlite::params![user_id],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn profile_history(&self, user_id: &str) -> Result<Vec<UserProfile>> {
    let user_id = user_id.to_owned();

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1 ORDER BY version DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawProfile::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Metrics ───────────────────────────────────────────────────────────────

  async fn save_metric(&self, input: NewMetric) -> Result<MetricSample> {
    input.validate()?;

    let sample = MetricSample {
      sample_id:   Uuid::new_v4(),
      user_id:     input.user_id,
      timestamp:   input.timestamp,
      source:      input.source,
      recorded_at: Utc::now(),
      values:      input.values,
    };

    let id_str       = encode_uuid(sample.sample_id);
    let user_id      = sample.user_id.clone();
    let ts_str       = encode_dt(sample.timestamp);
    let source       = sample.source.clone();
    let at_str       = encode_dt(sample.recorded_at);
    let v            = sample.values.clone();
    let workout_type = v.workout_type.map(|w| w.to_string());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO metrics (
             sample_id, user_id, timestamp, source, recorded_at,
             kcal_out, kcal_in, heart_rate, steps, sleep_score, weight_kg,
             protein_g, carbs_g, fat_g, workout_type, rpe, workout_minutes
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
          rusqlite::params![
            id_str,
            user_id,
            ts_str,
            source,
            at_str,
            v.kcal_out,
            v.kcal_in,
            v.heart_rate,
            v.steps,
            v.sleep_score,
            v.weight_kg,
            v.protein_g,
            v.carbs_g,
            v.fat_g,
            workout_type,
            v.rpe,
            v.workout_minutes,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(sample)
  }

  async fn get_latest_metrics(
    &self,
    user_id:     &str,
    window_days: u32,
    as_of:       DateTime<Utc>,
  ) -> Result<Vec<MetricSample>> {
    let from = TimeDelta::try_days(i64::from(window_days))
      .and_then(|d| as_of.checked_sub_signed(d))
      .ok_or_else(|| {
        macrocoach_core::Error::validation(
          "window_days",
          format!("{window_days} days reaches before the earliest representable time"),
        )
      })?;
    let user_id  = user_id.to_owned();
    let from_str = encode_dt(from);
    let to_str   = encode_dt(as_of);

    let raws: Vec<RawMetric> = self
      .conn
      .call(move |conn| {
        // Last write wins among samples sharing a timestamp.
        let mut stmt = conn.prepare(&format!(
          "SELECT {METRIC_COLUMNS} FROM metrics m
           WHERE m.user_id = ?1
             AND m.timestamp >= ?2
             AND m.timestamp <= ?3
             AND m.seq = (
               SELECT MAX(seq) FROM metrics d
               WHERE d.user_id = m.user_id AND d.timestamp = m.timestamp
             )
           ORDER BY m.timestamp DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, from_str, to_str], RawMetric::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMetric::into_sample).collect()
  }

  // ── Targets ───────────────────────────────────────────────────────────────

  async fn save_target(&self, target: MacroTarget) -> Result<StoredTarget> {
    let computed_at = Utc::now();

    let user_id  = target.user_id.clone();
    let date_str = encode_date(target.date);
    let at_str   = encode_dt(computed_at);
    let t        = target.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO macro_targets (
             user_id, date, kcal_target, protein_g_target, carbs_g_target,
             fat_g_target, bmr, tdee, observed_kcal_out, target_steps,
             workout_minutes, computed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            user_id,
            date_str,
            t.kcal_target,
            t.protein_g_target,
            t.carbs_g_target,
            t.fat_g_target,
            t.bmr,
            t.tdee,
            t.observed_kcal_out,
            t.target_steps,
            t.target_workout_minutes,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(StoredTarget { target, computed_at })
  }

  async fn latest_target(&self, user_id: &str) -> Result<Option<StoredTarget>> {
    Ok(self.target_history(user_id, 1).await?.into_iter().next())
  }

  async fn target_history(&self, user_id: &str, limit: usize) -> Result<Vec<StoredTarget>> {
    let user_id   = user_id.to_owned();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawTarget> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TARGET_COLUMNS} FROM macro_targets
           WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, limit_val], RawTarget::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTarget::into_target).collect()
  }

  async fn target_for_date(&self, user_id: &str, date: NaiveDate) -> Result<Option<StoredTarget>> {
    let user_id  = user_id.to_owned();
    let date_str = encode_date(date);

    let raw: Option<RawTarget> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TARGET_COLUMNS} FROM macro_targets
                 WHERE user_id = ?1 AND date = ?2 ORDER BY seq DESC LIMIT 1"
              ),
              rusqlite::params![user_id, date_str],
              RawTarget::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTarget::into_target).transpose()
  }

  // ── Meals ─────────────────────────────────────────────────────────────────

  async fn save_meals(&self, meals: &[MealSuggestion]) -> Result<()> {
    if let Some(m) = meals.iter().find(|m| m.status != MealStatus::Proposed) {
      return Err(
        macrocoach_core::Error::validation(
          "status",
          format!("meal {} must be stored as proposed, not {}", m.meal_id, m.status),
        )
        .into(),
      );
    }

    let rows = meals.iter().map(MealRow::encode).collect::<Result<Vec<_>>>()?;
    let count = rows.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for r in &rows {
          r.insert(&tx)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(count, "meals saved");
    Ok(())
  }

  async fn get_meal(&self, meal_id: Uuid) -> Result<Option<MealSuggestion>> {
    let id_str = encode_uuid(meal_id);

    let raw: Option<RawMeal> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MEAL_COLUMNS} FROM meals m
                 LEFT JOIN meal_transitions t ON t.meal_id = m.meal_id
                 WHERE m.meal_id = ?1"
              ),
              rusqlite::params![id_str],
              RawMeal::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMeal::into_meal).transpose()
  }

  async fn list_meals(&self, user_id: &str, date: NaiveDate) -> Result<Vec<MealSuggestion>> {
    let user_id  = user_id.to_owned();
    let date_str = encode_date(date);

    let raws: Vec<RawMeal> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MEAL_COLUMNS} FROM meals m
           LEFT JOIN meal_transitions t ON t.meal_id = m.meal_id
           WHERE m.user_id = ?1 AND m.date = ?2
           ORDER BY m.seq"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, date_str], RawMeal::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMeal::into_meal).collect()
  }

  async fn transition_meal(
    &self,
    meal_id:        Uuid,
    status:         MealStatus,
    replacement_id: Option<Uuid>,
  ) -> Result<MealTransition> {
    if status == MealStatus::Proposed {
      return Err(macrocoach_core::Error::InvalidTransition(status).into());
    }

    let raw = RawTransition {
      meal_id:        encode_uuid(meal_id),
      status:         status.to_string(),
      replacement_id: replacement_id.map(encode_uuid),
      recorded_at:    encode_dt(Utc::now()),
    };

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = TransitionOutcome::record(&tx, raw)?;
        if outcome.is_recorded() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    outcome.into_result(meal_id)
  }

  async fn swap_meal(
    &self,
    original_id: Uuid,
    replacement: &MealSuggestion,
  ) -> Result<MealTransition> {
    if replacement.status != MealStatus::Proposed {
      return Err(
        macrocoach_core::Error::validation("status", "a replacement must be stored as proposed")
          .into(),
      );
    }
    if replacement.replaces != Some(original_id) {
      return Err(
        macrocoach_core::Error::validation(
          "replaces",
          format!("replacement {} does not replace {original_id}", replacement.meal_id),
        )
        .into(),
      );
    }

    let row = MealRow::encode(replacement)?;
    let raw = RawTransition {
      meal_id:        encode_uuid(original_id),
      status:         MealStatus::Swapped.to_string(),
      replacement_id: Some(row.meal_id.clone()),
      recorded_at:    encode_dt(Utc::now()),
    };

    // Dropping the transaction without commit rolls the replacement back.
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        row.insert(&tx)?;
        let outcome = TransitionOutcome::record(&tx, raw)?;
        if outcome.is_recorded() {
          tx.commit()?;
        }
        Ok(outcome)
      })
      .await?;

    outcome.into_result(original_id)
  }

  // ── Chat ──────────────────────────────────────────────────────────────────

  async fn record_turn(&self, input: NewTurn) -> Result<ChatTurn> {
    let turn = ChatTurn {
      turn_id:     Uuid::new_v4(),
      user_id:     input.user_id,
      message:     input.message,
      reply:       input.reply,
      command:     input.command,
      recorded_at: Utc::now(),
    };

    let id_str  = encode_uuid(turn.turn_id);
    let user_id = turn.user_id.clone();
    let message = turn.message.clone();
    let reply   = turn.reply.clone();
    let command = turn.command.clone();
    let at_str  = encode_dt(turn.recorded_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_turns (turn_id, user_id, message, reply, command, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, user_id, message, reply, command, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(turn)
  }

  async fn recent_turns(&self, user_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
    let user_id   = user_id.to_owned();
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawTurn> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT turn_id, user_id, message, reply, command, recorded_at
           FROM chat_turns WHERE user_id = ?1 ORDER BY seq DESC LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, limit_val], |row| {
            Ok(RawTurn {
              turn_id:     row.get(0)?,
              user_id:     row.get(1)?,
              message:     row.get(2)?,
              reply:       row.get(3)?,
              command:     row.get(4)?,
              recorded_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTurn::into_turn).collect()
  }
}
