//! Chat pane, right panel: transcript above, input line below.

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::{App, Focus, Speaker};

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(3)])
    .split(area);

  let focused = app.focus == Focus::Chat;
  let border = if focused { Color::Cyan } else { Color::DarkGray };

  // ── Transcript ──
  let mut lines: Vec<Line> = Vec::new();
  for (speaker, text) in &app.transcript {
    let (label, color) = match speaker {
      Speaker::User => ("you", Color::Yellow),
      Speaker::Coach => ("coach", Color::Green),
    };
    lines.push(Line::from(Span::styled(
      label,
      Style::default().fg(color).add_modifier(Modifier::BOLD),
    )));
    lines.extend(text.lines().map(|l| Line::from(l.to_owned())));
    lines.push(Line::from(""));
  }
  if lines.is_empty() {
    lines.push(Line::from(Span::styled(
      "Say /help to see what the coach understands.",
      Style::default().fg(Color::DarkGray),
    )));
  }

  let block = Block::default()
    .title(" Coach ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(border));
  let inner = block.inner(rows[0]);

  // Keep the newest lines visible; wrapping is ignored for the estimate.
  let overflow = (lines.len() as u16).saturating_sub(inner.height);
  let scroll = overflow.saturating_sub(app.chat_scroll);

  f.render_widget(
    Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false })
      .scroll((scroll, 0)),
    rows[0],
  );

  // ── Input ──
  let cursor = if focused { "_" } else { "" };
  f.render_widget(
    Paragraph::new(format!("> {}{cursor}", app.input)).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border)),
    ),
    rows[1],
  );
}
