//! Dashboard pane, left panel: target, progress and today's meals.

use macrocoach_core::meal::MealStatus;
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::app::{App, Focus};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(12), Constraint::Min(0)])
    .split(area);

  draw_summary(f, rows[0], app);
  draw_meals(f, rows[1], app);
}

fn label(text: &str) -> Span<'static> {
  Span::styled(
    format!("{text:<14}"),
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
  )
}

fn dim(text: impl Into<String>) -> Line<'static> {
  Line::from(Span::styled(text.into(), Style::default().fg(Color::DarkGray)))
}

// ─── Summary ──────────────────────────────────────────────────────────────────

fn draw_summary(f: &mut Frame, area: Rect, app: &App) {
  let block = Block::default()
    .title(" Today ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let Some(report) = &app.status else {
    f.render_widget(Paragraph::new(dim("No data loaded.")).block(block), area);
    return;
  };

  let mut lines = Vec::new();
  match &report.target {
    Some(stored) => {
      let t = &stored.target;
      lines.push(Line::from(vec![label("target"), Span::raw(format!("{:.0} kcal", t.kcal_target))]));
      lines.push(Line::from(vec![
        label("macros"),
        Span::raw(format!(
          "P {:.0} g · C {:.0} g · F {:.0} g",
          t.protein_g_target, t.carbs_g_target, t.fat_g_target
        )),
      ]));
      lines.push(Line::from(vec![
        label("bmr / tdee"),
        Span::raw(format!("{:.0} / {:.0}", t.bmr, t.tdee)),
      ]));
      lines.push(Line::from(vec![
        label("activity"),
        Span::raw(format!("{} steps · {} min", t.target_steps, t.target_workout_minutes)),
      ]));
      lines.push(dim(format!("  computed for {}", t.date)));
    }
    None => lines.push(dim("No target yet. Send /plan.")),
  }
  lines.push(Line::from(""));

  match &report.progress {
    Some(p) => {
      lines.push(Line::from(vec![
        label(&format!("last {}d", report.window_days)),
        Span::raw(format!("{} days logged · {} samples", p.days, report.metric_count)),
      ]));
      lines.push(Line::from(vec![
        label("energy"),
        Span::raw(format!("in {:.0} · out {:.0} kcal/day", p.avg_kcal_in, p.avg_kcal_out)),
      ]));
      if let Some(today) = p.daily.last() {
        lines.push(Line::from(vec![
          label("balance"),
          Span::raw(format!("{:+.0} kcal on {}", today.kcal_balance, today.date)),
        ]));
      }
      lines.push(Line::from(vec![label("steps"), Span::raw(format!("{:.0}/day", p.avg_steps))]));
      let change = p
        .weight_change_kg
        .map(|c| format!(" ({c:+.1} kg)"))
        .unwrap_or_default();
      lines.push(Line::from(vec![label("weight"), Span::raw(format!("{}{change}", p.weight_trend))]));
    }
    None => lines.push(dim(format!("No metrics in the last {} days.", report.window_days))),
  }

  f.render_widget(Paragraph::new(lines).block(block), area);
}

// ─── Meals ────────────────────────────────────────────────────────────────────

fn draw_meals(f: &mut Frame, area: Rect, app: &App) {
  let focused = app.focus == Focus::Meals;
  let block = Block::default()
    .title(format!(" Meals ({}) ", app.meals.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }));

  if app.meals.is_empty() {
    f.render_widget(Paragraph::new(dim("No meals planned for today.")).block(block), area);
    return;
  }

  let items: Vec<ListItem> = app
    .meals
    .iter()
    .map(|meal| {
      let (badge, style) = match meal.status {
        MealStatus::Proposed => ("  ", Style::default()),
        MealStatus::Accepted => ("✓ ", Style::default().fg(Color::Green)),
        MealStatus::Swapped => ("× ", Style::default().fg(Color::DarkGray)),
      };
      let warn = if meal.low_confidence { " ?" } else { "" };
      ListItem::new(vec![
        Line::from(vec![
          Span::styled(badge, style),
          Span::styled(format!("{:<10}", meal.meal_type.to_string()), style),
          Span::styled(format!("{}{warn}", meal.name), style.add_modifier(Modifier::BOLD)),
        ]),
        Line::from(Span::styled(
          format!(
            "    {:.0} kcal · P {:.0} · C {:.0} · F {:.0}",
            meal.macros.kcal, meal.macros.protein_g, meal.macros.carbs_g, meal.macros.fat_g
          ),
          Style::default().fg(Color::DarkGray),
        )),
      ])
    })
    .collect();

  let mut state = ListState::default();
  state.select(focused.then_some(app.meal_cursor));

  f.render_stateful_widget(
    List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::Blue).fg(Color::White)),
    area,
    &mut state,
  );
}
