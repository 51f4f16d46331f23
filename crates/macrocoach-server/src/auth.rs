//! HTTP Basic auth for the `/api` routes.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  Json,
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use serde_json::json;

/// Credentials accepted as valid for this server instance.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

#[derive(Debug, thiserror::Error)]
#[error("unauthorized")]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
  fn into_response(self) -> Response {
    let mut res =
      (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
    res.headers_mut().insert(
      header::WWW_AUTHENTICATE,
      HeaderValue::from_static("Basic realm=\"macrocoach\""),
    );
    res
  }
}

/// Check the `Authorization: Basic` header against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Unauthorized> {
  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Unauthorized)?;
  let (username, password) = creds.split_once(':').ok_or(Unauthorized)?;

  if username != config.username {
    return Err(Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash).map_err(|_| Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Unauthorized)
}

/// `route_layer` middleware rejecting requests without valid credentials.
pub async fn require_auth(
  State(auth): State<Arc<AuthConfig>>,
  request: Request,
  next: Next,
) -> Result<Response, Unauthorized> {
  if let Err(e) = verify_auth(request.headers(), &auth) {
    tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
    return Err(e);
  }
  Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use rand_core::OsRng;

  use super::*;

  fn config(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "coach".into(), password_hash: hash }
  }

  fn basic(creds: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::AUTHORIZATION,
      HeaderValue::from_str(&format!("Basic {}", B64.encode(creds))).unwrap(),
    );
    headers
  }

  #[test]
  fn accepts_correct_credentials() {
    assert!(verify_auth(&basic("coach:hunter2"), &config("hunter2")).is_ok());
  }

  #[test]
  fn rejects_wrong_password_or_user() {
    let cfg = config("hunter2");
    assert!(verify_auth(&basic("coach:wrong"), &cfg).is_err());
    assert!(verify_auth(&basic("someone:hunter2"), &cfg).is_err());
  }

  #[test]
  fn rejects_missing_or_malformed_header() {
    let cfg = config("hunter2");
    assert!(verify_auth(&HeaderMap::new(), &cfg).is_err());

    let mut bearer = HeaderMap::new();
    bearer.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
    assert!(verify_auth(&bearer, &cfg).is_err());

    let mut garbage = HeaderMap::new();
    garbage.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
    assert!(verify_auth(&garbage, &cfg).is_err());
  }
}
