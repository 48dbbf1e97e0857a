//! Handlers for the Google sign-in flow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/auth/google/login` | 307 to the consent page |
//! | `GET`  | `/auth/google/callback` | `?code=&state=`; stores the credential |

use std::{
  collections::HashMap,
  sync::{Mutex, MutexGuard, PoisonError},
  time::{Duration, Instant},
};

use axum::{
  Json,
  extract::{Query, State},
  response::Redirect,
};
use duewatch_core::{UserId, credential::NewCredential};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// How long a consent round-trip may take before its `state` is refused.
const STATE_TTL: Duration = Duration::from_secs(10 * 60);

// ─── State tokens ────────────────────────────────────────────────────────────

/// One-shot `state` values handed out by `/login` and redeemed by
/// `/callback`.
#[derive(Debug, Default)]
pub struct LoginStates {
  issued: Mutex<HashMap<String, Instant>>,
}

impl LoginStates {
  pub fn issue(&self) -> String {
    let state = Uuid::new_v4().simple().to_string();
    let now   = Instant::now();

    let mut issued = self.lock();
    issued.retain(|_, at| now.duration_since(*at) < STATE_TTL);
    issued.insert(state.clone(), now);
    state
  }

  /// Consume `state`. Returns `false` if it was never issued, already used,
  /// or has expired.
  pub fn redeem(&self, state: &str) -> bool {
    self
      .lock()
      .remove(state)
      .is_some_and(|at| at.elapsed() < STATE_TTL)
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
    self.issued.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// `GET /auth/google/login`
pub async fn login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
  let token = state.logins.issue();
  let url   = state.oauth.authorize_url(&token).map_err(ApiError::upstream)?;
  Ok(Redirect::temporary(url.as_str()))
}

// ─── Callback ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub code:  Option<String>,
  pub state: Option<String>,
  /// Set by Google when the user declines consent.
  pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub message: &'static str,
  pub user_id: UserId,
  pub name:    String,
  pub email:   String,
}

/// `GET /auth/google/callback?code=<code>&state=<state>`
pub async fn callback(
  State(state): State<AppState>,
  Query(params): Query<CallbackParams>,
) -> Result<Json<LoginResponse>, ApiError> {
  if let Some(reason) = params.error {
    return Err(ApiError::BadRequest(format!("authorization denied: {reason}")));
  }
  let code = params
    .code
    .filter(|c| !c.is_empty())
    .ok_or_else(|| ApiError::BadRequest("no code in request".into()))?;
  let login_state = params.state.unwrap_or_default();
  if !state.logins.redeem(&login_state) {
    return Err(ApiError::BadRequest("unknown or expired login state".into()));
  }

  let grant = state.oauth.exchange_code(&code).await.map_err(ApiError::upstream)?;
  let user  = state
    .oauth
    .user_info(&grant.access_token)
    .await
    .map_err(ApiError::upstream)?;

  let stored = state
    .store
    .upsert_credential(NewCredential {
      google_id:     user.id,
      email:         user.email.clone(),
      name:          user.name.clone(),
      access_token:  grant.access_token,
      refresh_token: grant.refresh_token,
      expiry:        grant.expiry,
    })
    .await
    .map_err(ApiError::store)?;

  info!(
    user_id = stored.user_id,
    google_id = %stored.google_id,
    email = %user.email,
    "user authenticated"
  );

  Ok(Json(LoginResponse {
    message: "Login successful!",
    user_id: stored.user_id,
    name:    user.name,
    email:   user.email,
  }))
}
