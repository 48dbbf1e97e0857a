//! The persistent-store traits the scheduler reads and writes through.
//!
//! The traits are implemented by storage backends (e.g.
//! `duewatch-store-sqlite`). The scheduler depends on these abstractions, not
//! on any concrete backend. The store is shared with the login flow, so every
//! implementation must be safe under concurrent access; the scheduler adds no
//! locking of its own.

use std::future::Future;

use chrono::NaiveDate;

use crate::{UserId, credential::Credential, notification::NotificationKind};

// ─── Credentials ─────────────────────────────────────────────────────────────

/// Read access to stored user credentials.
pub trait CredentialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// A snapshot of every credential with a non-empty access token, ordered by
  /// user id. Concurrent writes made after the call are not reflected.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<Credential>, Self::Error>> + Send + '_;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The dedup authority: which `(user, assignment, kind)` triples were
/// notified on which date.
pub trait NotificationLedger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Whether a record exists for exactly this key. Pure read.
  fn has_been_notified<'a>(
    &'a self,
    user_id: UserId,
    assignment_id: &'a str,
    kind: &'a NotificationKind,
    on: NaiveDate,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Record a notification. Recording an existing key is a no-op, not an
  /// error, and never creates a second row.
  fn record_notified<'a>(
    &'a self,
    user_id: UserId,
    assignment_id: &'a str,
    kind: &'a NotificationKind,
    on: NaiveDate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
