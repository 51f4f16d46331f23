//! Apple Health `export.xml` reader.
//!
//! The export is a flat list of `<Record>` elements plus `<Workout>` elements.
//! Records are folded into one sample per UTC day, stamped at midnight:
//! counts and energy are summed, heart rate is averaged, and body mass keeps
//! the last reading of the day. Every workout becomes its own sample.
//! Sleep analysis and unknown record types are skipped.

use std::{collections::BTreeMap, path::PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use macrocoach_core::{
  metric::{Measurements, NewMetric, WorkoutType},
  source::MetricSource,
};
use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::error::{ConnectorError, Result};

pub const SOURCE: &str = "healthkit";

const LB_TO_KG: f64 = 0.453_592_37;
const KJ_TO_KCAL: f64 = 1.0 / 4.184;

// ─── Record types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantity {
  Steps,
  ActiveEnergy,
  BasalEnergy,
  HeartRate,
  BodyMass,
  DietaryEnergy,
  Protein,
  Carbs,
  Fat,
}

fn quantity(kind: &str) -> Option<Quantity> {
  let q = match kind.strip_prefix("HKQuantityTypeIdentifier")? {
    "StepCount" => Quantity::Steps,
    "ActiveEnergyBurned" => Quantity::ActiveEnergy,
    "BasalEnergyBurned" => Quantity::BasalEnergy,
    "HeartRate" => Quantity::HeartRate,
    "BodyMass" => Quantity::BodyMass,
    "DietaryEnergyConsumed" => Quantity::DietaryEnergy,
    "DietaryProtein" => Quantity::Protein,
    "DietaryCarbohydrates" => Quantity::Carbs,
    "DietaryFatTotal" => Quantity::Fat,
    _ => return None,
  };
  Some(q)
}

fn workout_type(activity: &str) -> WorkoutType {
  match activity.strip_prefix("HKWorkoutActivityType").unwrap_or(activity) {
    "Running" => WorkoutType::Running,
    "Walking" | "Hiking" => WorkoutType::Walking,
    "Cycling" => WorkoutType::Cycling,
    "Swimming" => WorkoutType::Swimming,
    "Yoga" | "Pilates" => WorkoutType::Yoga,
    "TraditionalStrengthTraining" | "FunctionalStrengthTraining" => WorkoutType::Strength,
    "HighIntensityIntervalTraining" | "Elliptical" | "Rowing" | "MixedCardio" | "StairClimbing" => {
      WorkoutType::Cardio
    }
    _ => WorkoutType::Other,
  }
}

/// Export timestamps look like `2024-06-01 08:15:00 +0200`.
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S %z")
    .or_else(|_| DateTime::parse_from_rfc3339(raw))
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

fn energy_kcal(value: f64, unit: Option<&str>) -> f64 {
  match unit {
    Some("kJ") => value * KJ_TO_KCAL,
    _ => value,
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct Day {
  steps:      f64,
  kcal_out:   Option<f64>,
  kcal_in:    Option<f64>,
  hr_sum:     f64,
  hr_count:   u32,
  /// `(reading time, kg)` of the latest body mass.
  weight:     Option<(DateTime<Utc>, f64)>,
  protein_g:  Option<f64>,
  carbs_g:    Option<f64>,
  fat_g:      Option<f64>,
  has_steps:  bool,
}

fn add(slot: &mut Option<f64>, value: f64) { *slot = Some(slot.unwrap_or(0.0) + value); }

impl Day {
  fn record(&mut self, q: Quantity, at: DateTime<Utc>, value: f64, unit: Option<&str>) {
    match q {
      Quantity::Steps => {
        self.steps += value;
        self.has_steps = true;
      }
      Quantity::ActiveEnergy | Quantity::BasalEnergy => add(&mut self.kcal_out, energy_kcal(value, unit)),
      Quantity::DietaryEnergy => add(&mut self.kcal_in, energy_kcal(value, unit)),
      Quantity::HeartRate => {
        self.hr_sum += value;
        self.hr_count += 1;
      }
      Quantity::BodyMass => {
        let kg = match unit {
          Some("lb") => value * LB_TO_KG,
          _ => value,
        };
        if self.weight.is_none_or(|(t, _)| at >= t) {
          self.weight = Some((at, kg));
        }
      }
      Quantity::Protein => add(&mut self.protein_g, value),
      Quantity::Carbs => add(&mut self.carbs_g, value),
      Quantity::Fat => add(&mut self.fat_g, value),
    }
  }

  fn into_measurements(self) -> Measurements {
    Measurements {
      steps: self.has_steps.then(|| self.steps.round() as u32),
      kcal_out: self.kcal_out,
      kcal_in: self.kcal_in,
      heart_rate: (self.hr_count > 0)
        .then(|| (self.hr_sum / f64::from(self.hr_count)).round() as u16),
      weight_kg: self.weight.map(|(_, kg)| kg),
      protein_g: self.protein_g,
      carbs_g: self.carbs_g,
      fat_g: self.fat_g,
      ..Default::default()
    }
  }
}

/// A `<Workout>` whose closing tag has not been seen yet.
struct OpenWorkout {
  start:  DateTime<Utc>,
  values: Measurements,
}

fn attrs(e: &BytesStart<'_>) -> BTreeMap<String, String> {
  e.attributes()
    .filter_map(|a| a.ok())
    .filter_map(|a| {
      let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
      let value = a.unescape_value().ok()?.into_owned();
      Some((key, value))
    })
    .collect()
}

fn workout(a: &BTreeMap<String, String>) -> Option<OpenWorkout> {
  let start = parse_date(a.get("startDate")?)?;
  let minutes = a.get("duration").and_then(|d| d.parse::<f64>().ok()).map(|d| {
    match a.get("durationUnit").map(String::as_str) {
      Some("s") => d / 60.0,
      Some("hr") | Some("h") => d * 60.0,
      _ => d,
    }
  });
  let kcal = a
    .get("totalEnergyBurned")
    .and_then(|v| v.parse::<f64>().ok())
    .map(|v| energy_kcal(v, a.get("totalEnergyBurnedUnit").map(String::as_str)));

  Some(OpenWorkout {
    start,
    values: Measurements {
      workout_type: Some(workout_type(a.get("workoutActivityType").map_or("", String::as_str))),
      workout_minutes: minutes.map(|m| m.round() as u32),
      kcal_out: kcal,
      ..Default::default()
    },
  })
}

/// Parser state while walking the event stream.
#[derive(Default)]
struct Export {
  days:     BTreeMap<NaiveDate, Day>,
  workouts: Vec<OpenWorkout>,
  open:     Option<OpenWorkout>,
  skipped:  usize,
}

impl Export {
  fn element(&mut self, e: &BytesStart<'_>, is_empty: bool) {
    match e.name().as_ref() {
      b"Record" => self.record(&attrs(e)),
      b"Workout" => match workout(&attrs(e)) {
        Some(w) if is_empty => self.workouts.push(w),
        Some(w) => self.open = Some(w),
        None => self.skipped += 1,
      },
      b"WorkoutStatistics" => {
        let a = attrs(e);
        if let Some(w) = self.open.as_mut()
          && w.values.kcal_out.is_none()
          && a.get("type").map(String::as_str) == Some("HKQuantityTypeIdentifierActiveEnergyBurned")
          && let Some(sum) = a.get("sum").and_then(|v| v.parse::<f64>().ok())
        {
          w.values.kcal_out = Some(energy_kcal(sum, a.get("unit").map(String::as_str)));
        }
      }
      _ => {}
    }
  }

  fn record(&mut self, a: &BTreeMap<String, String>) {
    let parsed = a
      .get("type")
      .and_then(|t| quantity(t))
      .zip(a.get("startDate").and_then(|d| parse_date(d)))
      .zip(a.get("value").and_then(|v| v.parse::<f64>().ok()));
    match parsed {
      Some(((q, at), value)) if value.is_finite() => {
        let unit = a.get("unit").map(String::as_str);
        self.days.entry(at.date_naive()).or_default().record(q, at, value, unit);
      }
      // Category records (sleep) and unknown types end up here too.
      _ => self.skipped += 1,
    }
  }

  fn into_samples(self, user_id: &str, since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<NewMetric> {
    let in_range = |t: &DateTime<Utc>| since <= *t && *t < until;
    let sample = |timestamp, values| NewMetric {
      user_id: user_id.to_owned(),
      timestamp,
      source: Some(SOURCE.to_owned()),
      values,
    };

    let mut samples: Vec<NewMetric> = self
      .days
      .into_iter()
      .filter_map(|(date, day)| {
        let timestamp = date.and_hms_opt(0, 0, 0)?.and_utc();
        let values = day.into_measurements();
        (in_range(&timestamp) && !values.is_empty()).then(|| sample(timestamp, values))
      })
      .chain(
        self
          .workouts
          .into_iter()
          .filter(|w| in_range(&w.start))
          .map(|w| sample(w.start, w.values)),
      )
      .collect();
    samples.sort_by_key(|m| m.timestamp);
    samples
  }
}

/// Parse an export held in memory. Only samples with
/// `since <= timestamp < until` are returned, oldest first.
pub fn parse_export(
  xml: &[u8],
  user_id: &str,
  since: DateTime<Utc>,
  until: DateTime<Utc>,
) -> Result<Vec<NewMetric>> {
  let mut reader = Reader::from_reader(xml);
  reader.config_mut().trim_text(true);

  let mut export = Export::default();
  let mut buf = Vec::new();
  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => export.element(e, false),
      Ok(Event::Empty(ref e)) => export.element(e, true),
      Ok(Event::End(ref e)) if e.name().as_ref() == b"Workout" => {
        let done = export.open.take();
        export.workouts.extend(done);
      }
      Ok(Event::Eof) => break,
      Err(e) => {
        return Err(ConnectorError::Xml {
          position: reader.buffer_position() as u64,
          message:  e.to_string(),
        });
      }
      _ => {}
    }
    buf.clear();
  }

  if export.skipped > 0 {
    tracing::debug!(skipped = export.skipped, "skipped health records");
  }
  Ok(export.into_samples(user_id, since, until))
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// An `export.xml` on disk. The file is read on every [`fetch`](MetricSource::fetch).
#[derive(Debug, Clone)]
pub struct HealthKitExport {
  path: PathBuf,
}

impl HealthKitExport {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl MetricSource for HealthKitExport {
  type Error = ConnectorError;

  fn name(&self) -> &str { SOURCE }

  async fn fetch(
    &self,
    user_id: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<NewMetric>> {
    let xml = tokio::fs::read(&self.path).await?;
    let samples = parse_export(&xml, user_id, since, until)?;
    tracing::info!(path = %self.path.display(), samples = samples.len(), "read health export");
    Ok(samples)
  }
}
