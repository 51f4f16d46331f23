//! Application state machine and event dispatcher.

use std::sync::Arc;

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use macrocoach_core::meal::{MealStatus, MealSuggestion};
use macrocoach_session::StatusReport;

use crate::client::ApiClient;

// ─── Focus ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
  /// Typing into the chat input.
  Chat,
  /// Moving through today's meals.
  Meals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
  User,
  Coach,
}

// ─── App ──────────────────────────────────────────────────────────────────────

pub struct App {
  pub focus: Focus,

  /// Whose data the dashboard shows and as whom chat messages are sent.
  pub user_id: String,

  /// Latest `/status` payload; `None` until the first refresh succeeds.
  pub status: Option<StatusReport>,

  /// Meals planned for today, swapped ones included.
  pub meals: Vec<MealSuggestion>,

  pub meal_cursor: usize,

  /// Conversation so far, oldest first.
  pub transcript: Vec<(Speaker, String)>,

  /// Lines scrolled up from the bottom of the transcript.
  pub chat_scroll: u16,

  pub input: String,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub client: Arc<ApiClient>,
}

impl App {
  pub fn new(client: ApiClient, user_id: String) -> Self {
    Self {
      focus: Focus::Chat,
      user_id,
      status: None,
      meals: Vec::new(),
      meal_cursor: 0,
      transcript: Vec::new(),
      chat_scroll: 0,
      input: String::new(),
      status_msg: String::new(),
      client: Arc::new(client),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Reload the dashboard: status and today's meals.
  pub async fn refresh(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Loading…".into();
    let today = Utc::now().date_naive();
    let loaded = async {
      let status = self.client.status(&self.user_id).await?;
      let meals = self.client.meals(&self.user_id, today).await?;
      anyhow::Ok((status, meals))
    }
    .await;

    match loaded {
      Ok((status, meals)) => {
        self.status = Some(status);
        self.meals = meals;
        self.meal_cursor = self.meal_cursor.min(self.meals.len().saturating_sub(1));
        self.status_msg.clear();
        Ok(())
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        Err(e)
      }
    }
  }

  /// Send `message` as a chat turn and append both sides to the transcript.
  pub async fn send(&mut self, message: String) {
    self.transcript.push((Speaker::User, message.clone()));
    self.chat_scroll = 0;
    self.status_msg = "Thinking…".into();
    match self.client.chat(&self.user_id, &message).await {
      Ok(reply) => {
        self.transcript.push((Speaker::Coach, reply));
        // Any command may have changed the plan or the metrics.
        let _ = self.refresh().await;
      }
      Err(e) => self.status_msg = format!("Error: {e}"),
    }
  }

  pub fn cursor_meal(&self) -> Option<&MealSuggestion> { self.meals.get(self.meal_cursor) }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('c') => return Ok(false),
        KeyCode::Char('r') => {
          let _ = self.refresh().await;
          return Ok(true);
        }
        _ => {}
      }
    }

    if key.code == KeyCode::Tab {
      self.focus = match self.focus {
        Focus::Chat => Focus::Meals,
        Focus::Meals => Focus::Chat,
      };
      return Ok(true);
    }

    match self.focus {
      Focus::Chat => self.handle_chat_key(key).await,
      Focus::Meals => self.handle_meal_key(key).await,
    }
  }

  async fn handle_chat_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Esc => return Ok(false),
      KeyCode::Enter => {
        let message = std::mem::take(&mut self.input);
        if !message.trim().is_empty() {
          self.send(message.trim().to_owned()).await;
        }
      }
      KeyCode::Backspace => {
        self.input.pop();
      }
      KeyCode::Up | KeyCode::PageUp => self.chat_scroll = self.chat_scroll.saturating_add(1),
      KeyCode::Down | KeyCode::PageDown => self.chat_scroll = self.chat_scroll.saturating_sub(1),
      KeyCode::Char(c) => self.input.push(c),
      _ => {}
    }
    Ok(true)
  }

  async fn handle_meal_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
      KeyCode::Down | KeyCode::Char('j') => {
        if self.meal_cursor + 1 < self.meals.len() {
          self.meal_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.meal_cursor = self.meal_cursor.saturating_sub(1);
      }
      KeyCode::Char('s') => self.act_on_meal("/swap").await,
      KeyCode::Char('a') => self.act_on_meal("/accept").await,
      _ => {}
    }
    Ok(true)
  }

  /// Run `command <meal_id>` for the meal under the cursor, if it can still
  /// change.
  async fn act_on_meal(&mut self, command: &str) {
    let Some(meal) = self.cursor_meal() else { return };
    if meal.status != MealStatus::Proposed {
      self.status_msg = format!("{} is already {}", meal.name, meal.status);
      return;
    }
    let message = format!("{command} {}", meal.meal_id);
    self.send(message).await;
  }
}

#[cfg(test)]
mod tests {
  use crossterm::event::KeyEventKind;

  use super::*;
  use crate::client::ApiConfig;

  fn app() -> App {
    let client = ApiClient::new(ApiConfig {
      base_url: "http://127.0.0.1:9".into(),
      username: String::new(),
      password: String::new(),
    })
    .unwrap();
    App::new(client, "ada".into())
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
  }

  #[tokio::test]
  async fn typing_edits_the_input() {
    let mut app = app();
    for c in "/plam".chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }
    app.handle_key(key(KeyCode::Backspace)).await.unwrap();
    app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
    assert_eq!(app.input, "/plan");
  }

  #[tokio::test]
  async fn tab_switches_focus_and_q_quits_only_from_meals() {
    let mut app = app();
    assert!(app.handle_key(key(KeyCode::Char('q'))).await.unwrap());
    assert_eq!(app.input, "q");

    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    assert_eq!(app.focus, Focus::Meals);
    assert!(!app.handle_key(key(KeyCode::Char('q'))).await.unwrap());
  }

  #[tokio::test]
  async fn meal_cursor_stays_in_bounds_without_meals() {
    let mut app = app();
    app.focus = Focus::Meals;
    app.handle_key(key(KeyCode::Down)).await.unwrap();
    app.handle_key(key(KeyCode::Up)).await.unwrap();
    assert_eq!(app.meal_cursor, 0);
    assert!(app.cursor_meal().is_none());

    // Nothing to act on, so nothing is sent.
    app.handle_key(key(KeyCode::Char('s'))).await.unwrap();
    assert!(app.transcript.is_empty());
  }

  #[tokio::test]
  async fn ctrl_c_quits() {
    let mut app = app();
    let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert!(!app.handle_key(ctrl_c).await.unwrap());
  }
}
