//! `macrocoach`: terminal client for a MacroCoach server.
//!
//! # Usage
//!
//! ```
//! macrocoach --url http://localhost:8080 --user coach --password secret --user-id ada
//! macrocoach --config ~/.config/macrocoach/config.toml
//! macrocoach --user-id ada --import ~/Downloads/apple_health_export/export.xml
//! ```

mod app;
mod client;
mod ui;

use std::{
  io,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result};
use app::App;
use chrono::{TimeDelta, Utc};
use clap::Parser;
use client::{ApiClient, ApiConfig};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use macrocoach_connectors::HealthKitExport;
use macrocoach_core::source::MetricSource as _;
use ratatui::{Terminal, backend::CrosstermBackend};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug, Default)]
#[command(name = "macrocoach", about = "Terminal client for MacroCoach")]
struct Args {
  /// Path to a TOML config file (url, username, password, user_id).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the MacroCoach server (default: http://localhost:8080).
  #[arg(long, env = "MACROCOACH_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "MACROCOACH_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "MACROCOACH_PASSWORD")]
  password: Option<String>,

  /// The coached user to show and chat as.
  #[arg(long, env = "MACROCOACH_USER_ID")]
  user_id: Option<String>,

  /// Upload metrics from an Apple Health `export.xml` and exit.
  #[arg(long, value_name = "EXPORT_XML")]
  import: Option<PathBuf>,

  /// How many days back `--import` reaches.
  #[arg(long, default_value_t = 30)]
  days: i64,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
  #[serde(default)]
  user_id:  String,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(args: &Args, file: ConfigFile) -> (ApiConfig, String) {
  let pick = |flag: &Option<String>, file: String| {
    flag.clone().or_else(|| (!file.is_empty()).then_some(file))
  };
  let config = ApiConfig {
    base_url: pick(&args.url, file.url).unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: pick(&args.user, file.username).unwrap_or_default(),
    password: pick(&args.password, file.password).unwrap_or_default(),
  };
  let user_id = pick(&args.user_id, file.user_id).unwrap_or_else(|| "me".to_string());
  (config, user_id)
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let (api_config, user_id) = resolve(&args, file_cfg);
  let client = ApiClient::new(api_config)?;

  if let Some(path) = &args.import {
    return import(&client, &user_id, path, args.days).await;
  }

  let mut app = App::new(client, user_id);

  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // A failed first load is shown in the status bar; the chat still works.
  let _ = app.refresh().await;
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

// ─── Import ───────────────────────────────────────────────────────────────────

async fn import(client: &ApiClient, user_id: &str, path: &Path, days: i64) -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let until = Utc::now();
  let since = until - TimeDelta::days(days);
  let metrics = HealthKitExport::new(path)
    .fetch(user_id, since, until)
    .await
    .with_context(|| format!("reading {}", path.display()))?;
  tracing::info!(count = metrics.len(), "parsed health export");

  let stored = client.upload_metrics(user_id, &metrics).await?;
  println!("imported {stored} samples for {user_id}");
  Ok(())
}

// ─── Event loop ───────────────────────────────────────────────────────────────

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}
