//! [`SqliteStore`], the SQLite implementation of [`CredentialStore`] and
//! [`NotificationLedger`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use duewatch_core::{
  UserId,
  credential::{Credential, NewCredential},
  notification::{NotificationKind, NotificationRecord},
  store::{CredentialStore, NotificationLedger},
};

use crate::{
  Result,
  encode::{RawCredential, RawRecord, encode_date, encode_dt},
  schema::SCHEMA,
};

const CREDENTIAL_COLUMNS: &str =
  "id, google_id, access_token, refresh_token, token_expiry";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A duewatch store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Credentials: login-flow writes ────────────────────────────────────────

  /// Insert or refresh the credential for `input.google_id`.
  ///
  /// The identity provider only issues a refresh token on first consent, so
  /// an empty incoming refresh token keeps the stored one.
  pub async fn upsert_credential(&self, input: NewCredential) -> Result<Credential> {
    let now_str      = encode_dt(Utc::now());
    let expiry_str   = encode_dt(input.expiry);
    let expiry       = input.expiry;
    let google_id    = input.google_id.clone();
    let access_token = input.access_token.clone();

    let (user_id, refresh_token): (UserId, String) = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO users (
             google_id, email, name, access_token, refresh_token,
             token_expiry, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT (google_id) DO UPDATE SET
             email         = excluded.email,
             name          = excluded.name,
             access_token  = excluded.access_token,
             refresh_token = CASE WHEN excluded.refresh_token = ''
                                  THEN users.refresh_token
                                  ELSE excluded.refresh_token END,
             token_expiry  = excluded.token_expiry,
             updated_at    = excluded.updated_at
           RETURNING id, refresh_token",
          rusqlite::params![
            input.google_id,
            input.email,
            input.name,
            input.access_token,
            input.refresh_token,
            expiry_str,
            now_str,
          ],
          |row| Ok((row.get(0)?, row.get(1)?)),
        )?)
      })
      .await?;

    tracing::debug!(user_id, google_id = %google_id, "stored credential");

    Ok(Credential {
      user_id,
      google_id,
      access_token,
      refresh_token,
      expiry,
    })
  }

  // ── Credentials: reads ────────────────────────────────────────────────────

  /// Retrieve one user's credential. Returns `None` if the user is unknown.
  pub async fn get_credential(&self, user_id: UserId) -> Result<Option<Credential>> {
    let raw: Option<RawCredential> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CREDENTIAL_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![user_id],
            RawCredential::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCredential::into_credential).transpose()
  }

  // ── Ledger: inspection ────────────────────────────────────────────────────

  /// Every ledger row for `user_id`, oldest date first.
  pub async fn notifications_for(&self, user_id: UserId) -> Result<Vec<NotificationRecord>> {
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, assignment_id, notification_kind, sent_on
           FROM notification_records
           WHERE user_id = ?1
           ORDER BY sent_on, assignment_id, notification_kind",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], |row| {
            Ok(RawRecord {
              user_id:           row.get(0)?,
              assignment_id:     row.get(1)?,
              notification_kind: row.get(2)?,
              sent_on:           row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── CredentialStore impl ────────────────────────────────────────────────────

impl CredentialStore for SqliteStore {
  type Error = crate::Error;

  async fn list_all(&self) -> Result<Vec<Credential>> {
    let raws: Vec<RawCredential> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CREDENTIAL_COLUMNS} FROM users
           WHERE access_token IS NOT NULL AND access_token != ''
           ORDER BY id"
        ))?;
        let rows = stmt
          .query_map([], RawCredential::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCredential::into_credential).collect()
  }
}

// ─── NotificationLedger impl ─────────────────────────────────────────────────

impl NotificationLedger for SqliteStore {
  type Error = crate::Error;

  async fn has_been_notified(
    &self,
    user_id:       UserId,
    assignment_id: &str,
    kind:          &NotificationKind,
    on:            NaiveDate,
  ) -> Result<bool> {
    let assignment_id = assignment_id.to_owned();
    let kind_str      = kind.as_str().to_owned();
    let on_str        = encode_date(on);

    let found = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM notification_records
             WHERE user_id = ?1 AND assignment_id = ?2
               AND notification_kind = ?3 AND sent_on = ?4",
            rusqlite::params![user_id, assignment_id, kind_str, on_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    Ok(found)
  }

  async fn record_notified(
    &self,
    user_id:       UserId,
    assignment_id: &str,
    kind:          &NotificationKind,
    on:            NaiveDate,
  ) -> Result<()> {
    let assignment_id = assignment_id.to_owned();
    let kind_str      = kind.as_str().to_owned();
    let on_str        = encode_date(on);
    let at_str        = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO notification_records (
             user_id, assignment_id, notification_kind, sent_on, recorded_at
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (user_id, assignment_id, notification_kind, sent_on)
           DO NOTHING",
          rusqlite::params![user_id, assignment_id, kind_str, on_str, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      tracing::debug!(user_id, "ledger row already present; insert ignored");
    }
    Ok(())
  }
}
