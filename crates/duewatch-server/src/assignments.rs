//! Handlers for `/api/v1` read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/v1/assignments` | `?user_id=<id>[&hours=<h>]`; 404 unknown user, 409 expired credential |
//! | `GET`  | `/api/v1/notifications` | `?user_id=<id>`; the user's ledger rows |

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Duration, Utc};
use duewatch_core::{
  UserId,
  assignment::{Assignment, DueWindow},
  notification::NotificationRecord,
  remote::AssignmentSource,
};
use duewatch_scheduler::MAX_LOOKAHEAD_HOURS as MAX_HOURS;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

// ─── Upcoming ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpcomingParams {
  pub user_id: UserId,
  pub hours:   Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UpcomingResponse {
  pub user_id:      UserId,
  pub window_start: DateTime<Utc>,
  pub window_end:   DateTime<Utc>,
  pub assignments:  Vec<Assignment>,
}

/// `GET /api/v1/assignments?user_id=<id>[&hours=<h>]`
///
/// Assignments due inside `[now, now + hours)`, soonest first. `hours`
/// defaults to the scheduler's look-ahead.
pub async fn upcoming(
  State(state): State<AppState>,
  Query(params): Query<UpcomingParams>,
) -> Result<Json<UpcomingResponse>, ApiError> {
  let span = match params.hours {
    None => state.lookahead,
    Some(h) if (1..=MAX_HOURS).contains(&h) => Duration::hours(i64::from(h)),
    Some(h) => {
      return Err(ApiError::BadRequest(format!(
        "hours must be between 1 and {MAX_HOURS}, got {h}"
      )));
    }
  };

  let credential = state
    .store
    .get_credential(params.user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {} not found", params.user_id)))?;

  let now = Utc::now();
  if credential.is_expired_at(now) {
    return Err(ApiError::Conflict(format!(
      "credential for user {} expired at {}; sign in again",
      params.user_id, credential.expiry
    )));
  }

  let window = DueWindow::ahead(now, span);
  let mut assignments = state
    .classroom
    .fetch_upcoming(&credential, window)
    .await
    .map_err(ApiError::upstream)?;
  assignments.sort_by_key(|a| a.due_time);

  Ok(Json(UpcomingResponse {
    user_id: params.user_id,
    window_start: window.start(),
    window_end: window.end(),
    assignments,
  }))
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NotificationParams {
  pub user_id: UserId,
}

/// `GET /api/v1/notifications?user_id=<id>`
pub async fn notifications(
  State(state): State<AppState>,
  Query(params): Query<NotificationParams>,
) -> Result<Json<Vec<NotificationRecord>>, ApiError> {
  let records = state
    .store
    .notifications_for(params.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}
