//! Notification kinds and ledger records.
//!
//! A [`NotificationRecord`] is written once per successfully dispatched
//! assignment and never updated or deleted. At most one record exists per
//! `(user_id, assignment_id, kind, sent_on)`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, UserId};

/// The only kind of reminder sent today.
pub const DEADLINE_REMINDER: &str = "deadline-reminder";

/// A non-empty label distinguishing categories of reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NotificationKind(String);

impl NotificationKind {
  pub fn new(label: impl Into<String>) -> Result<Self> {
    let label = label.into();
    let trimmed = label.trim();
    if trimmed.is_empty() {
      return Err(Error::InvalidNotificationKind(label));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl Default for NotificationKind {
  fn default() -> Self { Self(DEADLINE_REMINDER.to_owned()) }
}

impl fmt::Display for NotificationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl TryFrom<String> for NotificationKind {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<NotificationKind> for String {
  fn from(kind: NotificationKind) -> Self { kind.0 }
}

/// One row of the dedup ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
  pub user_id:       UserId,
  pub assignment_id: String,
  pub kind:          NotificationKind,
  /// Local calendar date of the cycle that sent the notification.
  pub sent_on:       NaiveDate,
}
