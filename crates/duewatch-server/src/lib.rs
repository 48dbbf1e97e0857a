//! HTTP surface of the duewatch server.
//!
//! Exposes an axum [`Router`] with the Google sign-in flow that stores
//! credentials, read endpoints for upcoming assignments and the notification
//! ledger, and a health check. The reminder scheduler runs beside it in the
//! binary.

pub mod assignments;
pub mod auth;
pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{Router, routing::get};
use duewatch_classroom::{ClassroomClient, GoogleOAuth};
use duewatch_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

pub use auth::LoginStates;
pub use config::ServerConfig;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
  pub store:     SqliteStore,
  pub oauth:     GoogleOAuth,
  pub classroom: ClassroomClient,
  pub logins:    Arc<LoginStates>,
  /// Default span for `/api/v1/assignments`.
  pub lookahead: chrono::Duration,
}

impl AppState {
  pub fn new(
    store:     SqliteStore,
    oauth:     GoogleOAuth,
    classroom: ClassroomClient,
    lookahead: chrono::Duration,
  ) -> Self {
    Self {
      store,
      oauth,
      classroom,
      logins: Arc::new(LoginStates::default()),
      lookahead,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/healthz", get(health))
    .route("/auth/google/login", get(auth::login))
    .route("/auth/google/callback", get(auth::callback))
    .route("/api/v1/assignments", get(assignments::upcoming))
    .route("/api/v1/notifications", get(assignments::notifications))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> &'static str { "ok" }
