//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, Utc};
use duewatch_core::{
  UserId,
  credential::Credential,
  notification::{NotificationKind, NotificationRecord},
};

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns read from a `users` row.
pub struct RawCredential {
  pub user_id:       UserId,
  pub google_id:     String,
  pub access_token:  Option<String>,
  pub refresh_token: String,
  pub token_expiry:  String,
}

impl RawCredential {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      google_id:     row.get(1)?,
      access_token:  row.get(2)?,
      refresh_token: row.get(3)?,
      token_expiry:  row.get(4)?,
    })
  }

  pub fn into_credential(self) -> Result<Credential> {
    Ok(Credential {
      user_id:       self.user_id,
      google_id:     self.google_id,
      access_token:  self.access_token.unwrap_or_default(),
      refresh_token: self.refresh_token,
      expiry:        decode_dt(&self.token_expiry)?,
    })
  }
}

/// Raw columns read from a `notification_records` row.
pub struct RawRecord {
  pub user_id:           UserId,
  pub assignment_id:     String,
  pub notification_kind: String,
  pub sent_on:           String,
}

impl RawRecord {
  pub fn into_record(self) -> Result<NotificationRecord> {
    Ok(NotificationRecord {
      user_id:       self.user_id,
      assignment_id: self.assignment_id,
      kind:          NotificationKind::new(self.notification_kind)?,
      sent_on:       decode_date(&self.sent_on)?,
    })
  }
}
