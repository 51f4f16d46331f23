//! `key=value` payloads for `/add` and `/profile`.
//!
//! Every problem is reported as a [`macrocoach_core::Error::Validation`] so
//! the session can hand the reason straight back to the user.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use macrocoach_core::{
  Error, Result,
  metric::{NewMetric, WorkoutType},
  profile::{ActivityLevel, Goal, NewProfile, Sex, UserProfile},
};

/// Source tag for samples logged through chat.
pub const MANUAL_SOURCE: &str = "manual";

/// Split `key=value` (or `key:value`).
fn pair(token: &str) -> Result<(String, &str)> {
  token
    .split_once(['=', ':'])
    .filter(|(k, v)| !k.is_empty() && !v.is_empty())
    .map(|(k, v)| (k.to_ascii_lowercase(), v))
    .ok_or_else(|| Error::validation("payload", format!("expected key=value, got `{token}`")))
}

/// Parse a number, ignoring a trailing unit such as `kg`, `g` or `kcal`.
fn number<T: FromStr>(field: &'static str, raw: &str) -> Result<T> {
  let digits = raw.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%');
  digits
    .parse()
    .map_err(|_| Error::validation(field, format!("`{raw}` is not a valid number")))
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` (UTC) or a bare date (midnight
/// UTC).
fn timestamp(raw: &str) -> Result<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
      return Ok(dt.and_utc());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .ok_or_else(|| Error::validation("at", format!("`{raw}` is not a date or timestamp")))
}

fn variant<T: FromStr>(kind: &'static str, raw: &str) -> Result<T> {
  raw.parse().map_err(|_| Error::unknown(kind, raw))
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// Build a validated sample from `/add` arguments. `now` is the timestamp
/// unless an `at=` argument overrides it.
pub fn parse_metric(user_id: &str, args: &[String], now: DateTime<Utc>) -> Result<NewMetric> {
  if args.is_empty() {
    return Err(Error::validation(
      "payload",
      "nothing to log; try `/add weight=72.5 steps=8000`",
    ));
  }

  let mut metric = NewMetric::new(user_id, now).with_source(MANUAL_SOURCE);
  for token in args {
    let (key, raw) = pair(token)?;
    let v = &mut metric.values;
    match key.as_str() {
      "weight" | "weight_kg" => v.weight_kg = Some(number("weight_kg", raw)?),
      "steps" => v.steps = Some(number("steps", raw)?),
      "hr" | "heart_rate" => v.heart_rate = Some(number("heart_rate", raw)?),
      "sleep" | "sleep_score" => v.sleep_score = Some(number("sleep_score", raw)?),
      "kcal_out" | "burned" => v.kcal_out = Some(number("kcal_out", raw)?),
      "kcal_in" | "kcal" | "calories" => v.kcal_in = Some(number("kcal_in", raw)?),
      "protein" | "protein_g" => v.protein_g = Some(number("protein_g", raw)?),
      "carbs" | "carbs_g" => v.carbs_g = Some(number("carbs_g", raw)?),
      "fat" | "fat_g" => v.fat_g = Some(number("fat_g", raw)?),
      "workout" | "workout_type" => v.workout_type = Some(variant::<WorkoutType>("workout", raw)?),
      "rpe" => v.rpe = Some(number("rpe", raw)?),
      "minutes" | "min" | "workout_minutes" => {
        v.workout_minutes = Some(number("workout_minutes", raw)?)
      }
      "at" | "time" => metric.timestamp = timestamp(raw)?,
      _ => return Err(Error::validation("payload", format!("unknown key `{key}`"))),
    }
  }

  metric.validate()?;
  Ok(metric)
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProfileFields {
  sex:      Option<Sex>,
  age:      Option<u32>,
  height:   Option<f64>,
  weight:   Option<f64>,
  activity: Option<ActivityLevel>,
  goal:     Option<Goal>,
  diet:     Option<BTreeSet<String>>,
}

/// Build the next profile version from `/profile` arguments. Fields not
/// mentioned are carried over from `current`; without a current profile
/// every field except `diet` is required.
pub fn parse_profile(
  user_id: &str,
  args: &[String],
  current: Option<&UserProfile>,
) -> Result<NewProfile> {
  let mut f = ProfileFields::default();
  for token in args {
    let (key, raw) = pair(token)?;
    match key.as_str() {
      "sex" | "gender" => f.sex = Some(variant("sex", raw)?),
      "age" => f.age = Some(number("age", raw)?),
      "height" | "height_cm" => f.height = Some(number("height_cm", raw)?),
      "weight" | "weight_kg" => f.weight = Some(number("weight_kg", raw)?),
      "activity" | "activity_level" => f.activity = Some(variant("activity_level", raw)?),
      "goal" => f.goal = Some(variant("goal", raw)?),
      "diet" | "dietary_preferences" => {
        let tags = f.diet.get_or_insert_with(BTreeSet::new);
        if !raw.eq_ignore_ascii_case("none") {
          tags.extend(raw.split('+').filter(|t| !t.is_empty()).map(str::to_lowercase));
        }
      }
      _ => return Err(Error::validation("payload", format!("unknown key `{key}`"))),
    }
  }

  let profile = match current {
    Some(p) => {
      let base = p.to_new();
      NewProfile {
        user_id:             user_id.to_owned(),
        sex:                 f.sex.unwrap_or(base.sex),
        age:                 f.age.unwrap_or(base.age),
        height_cm:           f.height.unwrap_or(base.height_cm),
        weight_kg:           f.weight.unwrap_or(base.weight_kg),
        activity_level:      f.activity.unwrap_or(base.activity_level),
        goal:                f.goal.unwrap_or(base.goal),
        dietary_preferences: f.diet.unwrap_or(base.dietary_preferences),
      }
    }
    None => NewProfile {
      user_id:             user_id.to_owned(),
      sex:                 f.sex.ok_or_else(|| missing("sex"))?,
      age:                 f.age.ok_or_else(|| missing("age"))?,
      height_cm:           f.height.ok_or_else(|| missing("height"))?,
      weight_kg:           f.weight.ok_or_else(|| missing("weight"))?,
      activity_level:      f.activity.ok_or_else(|| missing("activity"))?,
      goal:                f.goal.ok_or_else(|| missing("goal"))?,
      dietary_preferences: f.diet.unwrap_or_default(),
    },
  };

  profile.validate()?;
  Ok(profile)
}

fn missing(field: &'static str) -> Error {
  Error::validation(field, "is required for a new profile")
}
