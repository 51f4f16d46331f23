//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexicographic order is chronological.
//! Dates are `YYYY-MM-DD`. Enumerations are stored as their snake_case
//! names. Nested structures (ingredients, provenance, dietary tags) are
//! compact JSON.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use macrocoach_core::{
  meal::{MealStatus, MealSuggestion, MealTransition},
  metric::{Measurements, MetricSample},
  profile::UserProfile,
  store::StoredTarget,
  target::{MacroTarget, Macros},
  turn::ChatTurn,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a stored enumeration name.
pub fn decode_enum<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Core(macrocoach_core::Error::unknown(kind, s)))
}

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── Raw row types ───────────────────────────────────────────────────────────
//
// Intermediate structs produced inside `Connection::call` closures. They hold
// only owned primitives so they can cross the thread boundary; decoding into
// domain types happens afterwards on the async side.

pub struct RawProfile {
  pub user_id:             String,
  pub version:             u32,
  pub sex:                 String,
  pub age:                 u32,
  pub height_cm:           f64,
  pub weight_kg:           f64,
  pub activity_level:      String,
  pub goal:                String,
  pub dietary_preferences: String,
  pub recorded_at:         String,
}

pub const PROFILE_COLUMNS: &str = "user_id, version, sex, age, height_cm, weight_kg, \
                                   activity_level, goal, dietary_preferences, recorded_at";

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:             row.get(0)?,
      version:             row.get(1)?,
      sex:                 row.get(2)?,
      age:                 row.get(3)?,
      height_cm:           row.get(4)?,
      weight_kg:           row.get(5)?,
      activity_level:      row.get(6)?,
      goal:                row.get(7)?,
      dietary_preferences: row.get(8)?,
      recorded_at:         row.get(9)?,
    })
  }

  pub fn into_profile(self) -> Result<UserProfile> {
    let dietary_preferences: BTreeSet<String> =
      serde_json::from_str(&self.dietary_preferences)?;
    Ok(UserProfile {
      user_id: self.user_id,
      version: self.version,
      sex: decode_enum("sex", &self.sex)?,
      age: self.age,
      height_cm: self.height_cm,
      weight_kg: self.weight_kg,
      activity_level: decode_enum("activity level", &self.activity_level)?,
      goal: decode_enum("goal", &self.goal)?,
      dietary_preferences,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawMetric {
  pub sample_id:       String,
  pub user_id:         String,
  pub timestamp:       String,
  pub source:          Option<String>,
  pub recorded_at:     String,
  pub kcal_out:        Option<f64>,
  pub kcal_in:         Option<f64>,
  pub heart_rate:      Option<u16>,
  pub steps:           Option<u32>,
  pub sleep_score:     Option<u8>,
  pub weight_kg:       Option<f64>,
  pub protein_g:       Option<f64>,
  pub carbs_g:         Option<f64>,
  pub fat_g:           Option<f64>,
  pub workout_type:    Option<String>,
  pub rpe:             Option<u8>,
  pub workout_minutes: Option<u32>,
}

pub const METRIC_COLUMNS: &str = "sample_id, user_id, timestamp, source, recorded_at, \
                                  kcal_out, kcal_in, heart_rate, steps, sleep_score, \
                                  weight_kg, protein_g, carbs_g, fat_g, workout_type, rpe, \
                                  workout_minutes";

impl RawMetric {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      sample_id:       row.get(0)?,
      user_id:         row.get(1)?,
      timestamp:       row.get(2)?,
      source:          row.get(3)?,
      recorded_at:     row.get(4)?,
      kcal_out:        row.get(5)?,
      kcal_in:         row.get(6)?,
      heart_rate:      row.get(7)?,
      steps:           row.get(8)?,
      sleep_score:     row.get(9)?,
      weight_kg:       row.get(10)?,
      protein_g:       row.get(11)?,
      carbs_g:         row.get(12)?,
      fat_g:           row.get(13)?,
      workout_type:    row.get(14)?,
      rpe:             row.get(15)?,
      workout_minutes: row.get(16)?,
    })
  }

  pub fn into_sample(self) -> Result<MetricSample> {
    Ok(MetricSample {
      sample_id:   decode_uuid(&self.sample_id)?,
      user_id:     self.user_id,
      timestamp:   decode_dt(&self.timestamp)?,
      source:      self.source,
      recorded_at: decode_dt(&self.recorded_at)?,
      values:      Measurements {
        kcal_out:        self.kcal_out,
        kcal_in:         self.kcal_in,
        heart_rate:      self.heart_rate,
        steps:           self.steps,
        sleep_score:     self.sleep_score,
        weight_kg:       self.weight_kg,
        protein_g:       self.protein_g,
        carbs_g:         self.carbs_g,
        fat_g:           self.fat_g,
        workout_type:    self
          .workout_type
          .as_deref()
          .map(|s| decode_enum("workout type", s))
          .transpose()?,
        rpe:             self.rpe,
        workout_minutes: self.workout_minutes,
      },
    })
  }
}

pub struct RawTarget {
  pub user_id:           String,
  pub date:              String,
  pub kcal_target:       f64,
  pub protein_g_target:  f64,
  pub carbs_g_target:    f64,
  pub fat_g_target:      f64,
  pub bmr:               f64,
  pub tdee:              f64,
  pub observed_kcal_out: Option<f64>,
  pub target_steps:      u32,
  pub workout_minutes:   u32,
  pub computed_at:       String,
}

pub const TARGET_COLUMNS: &str = "user_id, date, kcal_target, protein_g_target, \
                                  carbs_g_target, fat_g_target, bmr, tdee, \
                                  observed_kcal_out, target_steps, \
                                  workout_minutes, computed_at";

impl RawTarget {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:           row.get(0)?,
      date:              row.get(1)?,
      kcal_target:       row.get(2)?,
      protein_g_target:  row.get(3)?,
      carbs_g_target:    row.get(4)?,
      fat_g_target:      row.get(5)?,
      bmr:               row.get(6)?,
      tdee:              row.get(7)?,
      observed_kcal_out: row.get(8)?,
      target_steps:      row.get(9)?,
      workout_minutes:   row.get(10)?,
      computed_at:       row.get(11)?,
    })
  }

  pub fn into_target(self) -> Result<StoredTarget> {
    Ok(StoredTarget {
      target:      MacroTarget {
        user_id:           self.user_id,
        date:              decode_date(&self.date)?,
        kcal_target:       self.kcal_target,
        protein_g_target:  self.protein_g_target,
        carbs_g_target:    self.carbs_g_target,
        fat_g_target:      self.fat_g_target,
        bmr:               self.bmr,
        tdee:              self.tdee,
        observed_kcal_out: self.observed_kcal_out,
        target_steps:           self.target_steps,
        target_workout_minutes: self.workout_minutes,
      },
      computed_at: decode_dt(&self.computed_at)?,
    })
  }
}

/// A meal row joined with its (optional) transition.
pub struct RawMeal {
  pub meal_id:        String,
  pub user_id:        String,
  pub date:           String,
  pub name:           String,
  pub meal_type:      String,
  pub kcal:           f64,
  pub protein_g:      f64,
  pub carbs_g:        f64,
  pub fat_g:          f64,
  pub cuisine:        Option<String>,
  pub ingredients:    String,
  pub instructions:   String,
  pub low_confidence: bool,
  pub provenance:     String,
  pub replaces:       Option<String>,
  pub created_at:     String,
  pub status:         Option<String>,
}

/// Select list for `meals m LEFT JOIN meal_transitions t`.
pub const MEAL_COLUMNS: &str = "m.meal_id, m.user_id, m.date, m.name, m.meal_type, m.kcal, \
                                m.protein_g, m.carbs_g, m.fat_g, m.cuisine, m.ingredients, \
                                m.instructions, m.low_confidence, m.provenance, m.replaces, \
                                m.created_at, t.status";

impl RawMeal {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      meal_id:        row.get(0)?,
      user_id:        row.get(1)?,
      date:           row.get(2)?,
      name:           row.get(3)?,
      meal_type:      row.get(4)?,
      kcal:           row.get(5)?,
      protein_g:      row.get(6)?,
      carbs_g:        row.get(7)?,
      fat_g:          row.get(8)?,
      cuisine:        row.get(9)?,
      ingredients:    row.get(10)?,
      instructions:   row.get(11)?,
      low_confidence: row.get(12)?,
      provenance:     row.get(13)?,
      replaces:       row.get(14)?,
      created_at:     row.get(15)?,
      status:         row.get(16)?,
    })
  }

  pub fn into_meal(self) -> Result<MealSuggestion> {
    let status = match self.status.as_deref() {
      Some(s) => decode_enum("meal status", s)?,
      None => MealStatus::Proposed,
    };
    Ok(MealSuggestion {
      meal_id: decode_uuid(&self.meal_id)?,
      user_id: self.user_id,
      date: decode_date(&self.date)?,
      name: self.name,
      meal_type: decode_enum("meal type", &self.meal_type)?,
      macros: Macros {
        kcal:      self.kcal,
        protein_g: self.protein_g,
        carbs_g:   self.carbs_g,
        fat_g:     self.fat_g,
      },
      cuisine: self.cuisine,
      ingredients: serde_json::from_str(&self.ingredients)?,
      instructions: serde_json::from_str(&self.instructions)?,
      status,
      low_confidence: self.low_confidence,
      provenance: serde_json::from_str(&self.provenance)?,
      replaces: decode_opt_uuid(self.replaces)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawTransition {
  pub meal_id:        String,
  pub status:         String,
  pub replacement_id: Option<String>,
  pub recorded_at:    String,
}

impl RawTransition {
  pub fn into_transition(self) -> Result<MealTransition> {
    Ok(MealTransition {
      meal_id:        decode_uuid(&self.meal_id)?,
      status:         decode_enum("meal status", &self.status)?,
      replacement_id: decode_opt_uuid(self.replacement_id)?,
      recorded_at:    decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawTurn {
  pub turn_id:     String,
  pub user_id:     String,
  pub message:     String,
  pub reply:       String,
  pub command:     String,
  pub recorded_at: String,
}

impl RawTurn {
  pub fn into_turn(self) -> Result<ChatTurn> {
    Ok(ChatTurn {
      turn_id:     decode_uuid(&self.turn_id)?,
      user_id:     self.user_id,
      message:     self.message,
      reply:       self.reply,
      command:     self.command,
      recorded_at: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use macrocoach_core::profile::Goal;

  use super::*;

  #[test]
  fn timestamps_sort_lexicographically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
    let b = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(a)).unwrap(), a);
  }

  #[test]
  fn unknown_enum_names_are_rejected() {
    let err = decode_enum::<Goal>("goal", "hibernate").unwrap_err();
    assert!(matches!(
      err,
      Error::Core(macrocoach_core::Error::UnknownVariant { kind: "goal", .. })
    ));
  }
}
