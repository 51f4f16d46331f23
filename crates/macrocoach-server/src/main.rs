//! macrocoach-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `MACROCOACH_*` environment variables, opens the SQLite store, and serves
//! the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! ```
//! cargo run -p macrocoach-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use chrono::Utc;
use clap::Parser;
use macrocoach_core::generate::MealGenerator as _;
use macrocoach_server::{AppState, ServerConfig, build_session, seed};
use macrocoach_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "MacroCoach server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Write a demo profile and two weeks of metrics for this user, then exit.
  #[arg(long, value_name = "USER")]
  seed_demo: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("MACROCOACH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.auth_username.is_some() && server_cfg.auth_password_hash.is_none() {
    anyhow::bail!("auth_username is set but auth_password_hash is missing");
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let store = Arc::new(store);

  if let Some(user_id) = cli.seed_demo {
    let count = seed::seed_demo(store.as_ref(), &user_id, Utc::now())
      .await
      .with_context(|| format!("failed to seed demo data for {user_id}"))?;
    println!("seeded {count} samples for {user_id}");
    return Ok(());
  }

  let generator = server_cfg
    .meals
    .generator()
    .context("failed to build meal generator")?;
  tracing::info!(generator = generator.name(), "meal generator ready");

  let session = build_session(&server_cfg, store, generator);
  let auth = server_cfg.auth().map(Arc::new);
  if auth.is_none() {
    tracing::warn!("auth_username not set; the API is unauthenticated");
  }

  let app = macrocoach_server::router(AppState { session: Arc::new(session), auth });
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
