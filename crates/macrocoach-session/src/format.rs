//! Plain-text replies.

use macrocoach_core::{
  meal::{MealStatus, MealSuggestion},
  metric::{Measurements, MetricSample},
  profile::UserProfile,
  progress::{ProgressSummary, WeightTrend},
  store::StoredTarget,
  target::MacroTarget,
};

pub const HELP: &str = "\
MacroCoach commands

Tracking
  /status                      recent metrics, current target and progress
  /add key=value ...           log metrics: weight steps hr sleep kcal_in kcal_out
                               protein carbs fat workout rpe minutes at
Planning
  /plan [cuisine ...]          compute today's target and suggest meals
  /swap <meal_id>              replace a suggested meal
  /accept <meal_id>            mark a suggested meal as eaten
Profile
  /profile                     show your profile
  /profile key=value ...       update it: sex age height weight activity goal diet

Example: /add weight=72.5 steps=8500 protein=30";

pub const ONBOARDING: &str = "\
I need your profile before I can plan anything. Send for example:

  /profile sex=male age=30 height=180 weight=80 activity=moderate goal=lose

activity: sedentary, light, moderate, active, very_active
goal: lose, maintain, gain
diet (optional): tags joined with +, e.g. diet=vegetarian+halal";

pub const NO_DATA: &str =
  "Nothing logged in the last few days. Use /add to log your first metrics.";

pub const APOLOGY: &str = "Sorry, something went wrong on my side. Please try again in a moment.";

pub fn unknown(name: &str) -> String { format!("Unknown command /{name}.\n\n{HELP}") }

pub fn rejected(reason: &str) -> String { format!("Could not do that: {reason}") }

fn latest<T>(metrics: &[MetricSample], f: impl Fn(&Measurements) -> Option<T>) -> Option<T> {
  metrics.iter().find_map(|m| f(&m.values))
}

fn target_lines(t: &MacroTarget) -> Vec<String> {
  let mut lines = vec![
    format!("Target for {}", t.date),
    format!("  {:.0} kcal", t.kcal_target),
    format!(
      "  protein {:.0} g  carbs {:.0} g  fat {:.0} g",
      t.protein_g_target, t.carbs_g_target, t.fat_g_target
    ),
    format!("  BMR {:.0} kcal, TDEE {:.0} kcal", t.bmr, t.tdee),
    format!("  move {} steps, train {} min", t.target_steps, t.target_workout_minutes),
  ];
  if let Some(out) = t.observed_kcal_out {
    lines.push(format!("  adjusted for {out:.0} kcal/day you reported burning"));
  }
  lines
}

// ── /status ──────────────────────────────────────────────────────────────

pub fn status(
  metrics: &[MetricSample],
  target: Option<&StoredTarget>,
  progress: Option<&ProgressSummary>,
  window_days: u32,
) -> String {
  if metrics.is_empty() && target.is_none() {
    return NO_DATA.to_owned();
  }

  let mut lines = Vec::new();
  if !metrics.is_empty() {
    lines.push(format!("Latest readings ({} samples, last {window_days} days)", metrics.len()));
    if let Some(w) = latest(metrics, |v| v.weight_kg) {
      lines.push(format!("  weight      {w:.1} kg"));
    }
    if let Some(s) = latest(metrics, |v| v.steps) {
      lines.push(format!("  steps       {s}"));
    }
    if let Some(hr) = latest(metrics, |v| v.heart_rate) {
      lines.push(format!("  heart rate  {hr} bpm"));
    }
    if let Some(s) = latest(metrics, |v| v.sleep_score) {
      lines.push(format!("  sleep       {s}/100"));
    }
    if let Some(k) = latest(metrics, |v| v.kcal_in) {
      lines.push(format!("  eaten       {k:.0} kcal"));
    }
    if let Some(k) = latest(metrics, |v| v.kcal_out) {
      lines.push(format!("  burned      {k:.0} kcal"));
    }
    if let Some(w) = latest(metrics, |v| v.workout_type) {
      lines.push(format!("  workout     {w}"));
    }
  }

  if let Some(t) = target {
    lines.push(String::new());
    lines.extend(target_lines(&t.target));
  }

  if let Some(p) = progress {
    lines.push(String::new());
    lines.push(format!("Progress over {} days", p.days));
    let trend = match (p.weight_trend, p.weight_change_kg) {
      (WeightTrend::Stable, _) | (_, None) => p.weight_trend.to_string(),
      (trend, Some(change)) => format!("{trend} ({change:+.1} kg)"),
    };
    lines.push(format!("  weight trend  {trend}"));
    lines.push(format!("  avg eaten     {:.0} kcal/day", p.avg_kcal_in));
    lines.push(format!("  avg burned    {:.0} kcal/day", p.avg_kcal_out));
    lines.push(format!("  avg steps     {:.0}/day", p.avg_steps));
    lines.push(format!("  workout days  {}/{}", p.workout_days, p.days));
    lines.push("  day         eaten  burned  balance".to_owned());
    for d in &p.daily {
      lines.push(format!(
        "  {}  {:>5.0}  {:>6.0}  {:>+7.0}",
        d.date, d.kcal_in, d.kcal_out, d.kcal_balance
      ));
    }
  }

  if target.is_none() {
    lines.push(String::new());
    lines.push("Send /plan for today's targets and meals.".to_owned());
  }
  lines.join("\n")
}

// ── Meals ────────────────────────────────────────────────────────────────

fn meal_lines(meal: &MealSuggestion) -> Vec<String> {
  let m = &meal.macros;
  let mut head = format!("{} ({})", meal.name, meal.meal_type);
  if meal.status != MealStatus::Proposed {
    head.push_str(&format!(" [{}]", meal.status));
  }
  if meal.low_confidence {
    head.push_str(" [rough estimate]");
  }
  vec![
    head,
    format!(
      "   {:.0} kcal, protein {:.0} g, carbs {:.0} g, fat {:.0} g",
      m.kcal, m.protein_g, m.carbs_g, m.fat_g
    ),
    format!("   id {}", meal.meal_id),
  ]
}

pub fn plan(target: &MacroTarget, meals: &[MealSuggestion]) -> String {
  let mut lines = target_lines(target);
  lines.push(String::new());
  lines.push("Suggested meals".to_owned());
  for (i, meal) in meals.iter().enumerate() {
    let mut block = meal_lines(meal);
    block[0] = format!("{}. {}", i + 1, block[0]);
    lines.extend(block);
  }
  if meals.iter().any(|m| m.provenance.degraded) {
    lines.push(String::new());
    lines.push("The meal generator was unavailable; some meals come from the built-in pantry.".to_owned());
  }
  lines.push(String::new());
  lines.push("Use /swap <id> to replace a meal or /accept <id> once you ate it.".to_owned());
  lines.join("\n")
}

pub fn swapped(original: &MealSuggestion, replacement: &MealSuggestion) -> String {
  let mut lines = vec![format!("Swapped out {}. Instead:", original.name)];
  lines.extend(meal_lines(replacement));
  if !replacement.ingredients.is_empty() {
    lines.push("   ingredients:".to_owned());
    for i in &replacement.ingredients {
      lines.push(format!("     {} {} {}", i.amount, i.unit, i.name));
    }
  }
  lines.join("\n")
}

pub fn accepted(meal: &MealSuggestion) -> String {
  format!("Marked {} as eaten ({:.0} kcal).", meal.name, meal.macros.kcal)
}

// ── /add ─────────────────────────────────────────────────────────────────

pub fn logged(sample: &MetricSample) -> String {
  let v = &sample.values;
  let mut parts = Vec::new();
  if let Some(w) = v.weight_kg {
    parts.push(format!("weight {w} kg"));
  }
  if let Some(s) = v.steps {
    parts.push(format!("{s} steps"));
  }
  if let Some(hr) = v.heart_rate {
    parts.push(format!("heart rate {hr} bpm"));
  }
  if let Some(s) = v.sleep_score {
    parts.push(format!("sleep {s}/100"));
  }
  if let Some(k) = v.kcal_in {
    parts.push(format!("{k} kcal eaten"));
  }
  if let Some(k) = v.kcal_out {
    parts.push(format!("{k} kcal burned"));
  }
  if let Some(p) = v.protein_g {
    parts.push(format!("protein {p} g"));
  }
  if let Some(c) = v.carbs_g {
    parts.push(format!("carbs {c} g"));
  }
  if let Some(f) = v.fat_g {
    parts.push(format!("fat {f} g"));
  }
  if let Some(w) = v.workout_type {
    let mut s = format!("{w} workout");
    if let Some(min) = v.workout_minutes {
      s.push_str(&format!(" for {min} min"));
    }
    if let Some(rpe) = v.rpe {
      s.push_str(&format!(" at RPE {rpe}"));
    }
    parts.push(s);
  } else {
    if let Some(min) = v.workout_minutes {
      parts.push(format!("{min} min of exercise"));
    }
    if let Some(rpe) = v.rpe {
      parts.push(format!("RPE {rpe}"));
    }
  }
  format!(
    "Logged {} for {}.",
    parts.join(", "),
    sample.timestamp.format("%Y-%m-%d %H:%M UTC")
  )
}

// ── /profile ─────────────────────────────────────────────────────────────

pub fn profile(p: &UserProfile) -> String {
  let diet = if p.dietary_preferences.is_empty() {
    "none".to_owned()
  } else {
    p.dietary_preferences.iter().cloned().collect::<Vec<_>>().join(", ")
  };
  [
    format!("Profile (version {})", p.version),
    format!("  {}, {} years, {} cm", p.sex, p.age, p.height_cm),
    format!("  weight    {:.1} kg", p.weight_kg),
    format!("  activity  {}", p.activity_level),
    format!("  goal      {}", p.goal),
    format!("  diet      {diet}"),
  ]
  .join("\n")
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;

  #[test]
  fn logged_mentions_each_value() {
    let sample = MetricSample {
      sample_id:   Uuid::new_v4(),
      user_id:     "ada".into(),
      timestamp:   Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap(),
      source:      None,
      recorded_at: Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 1).unwrap(),
      values:      Measurements {
        weight_kg: Some(72.5),
        steps: Some(8500),
        ..Default::default()
      },
    };
    let text = logged(&sample);
    assert!(text.contains("weight 72.5 kg"));
    assert!(text.contains("8500 steps"));
    assert!(text.contains("2024-06-10 08:00 UTC"));
  }

  #[test]
  fn empty_status() {
    assert_eq!(status(&[], None, None, 7), NO_DATA);
  }

  #[test]
  fn status_lists_daily_balance() {
    let sample = |hour: u32, values: Measurements| MetricSample {
      sample_id:   Uuid::new_v4(),
      user_id:     "ada".into(),
      timestamp:   Utc.with_ymd_and_hms(2024, 6, 9, hour, 0, 0).unwrap(),
      source:      None,
      recorded_at: Utc.with_ymd_and_hms(2024, 6, 9, hour, 0, 0).unwrap(),
      values,
    };
    let metrics = [
      sample(20, Measurements { kcal_out: Some(2450.0), ..Default::default() }),
      sample(13, Measurements { kcal_in: Some(2100.0), ..Default::default() }),
    ];
    let progress = ProgressSummary::from_metrics(&metrics);
    let text = status(&metrics, None, progress.as_ref(), 7);
    assert!(text.contains("  2024-06-09   2100    2450     -350"), "{text}");
  }

  #[test]
  fn unknown_includes_help() {
    let text = unknown("dance");
    assert!(text.starts_with("Unknown command /dance."));
    assert!(text.contains("/status"));
  }
}
