//! Credentials: the per-user OAuth token snapshot the scheduler reads.
//!
//! Credentials are written by the login flow and only ever read by the
//! scheduler. A credential whose `expiry` has passed is skipped for the cycle;
//! no refresh is attempted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A stored access/refresh token pair for one user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
  pub user_id:       UserId,
  /// The user's account id at the identity provider; used in logs.
  pub google_id:     String,
  pub access_token:  String,
  pub refresh_token: String,
  pub expiry:        DateTime<Utc>,
}

impl Credential {
  /// A credential expiring exactly at `now` is already unusable.
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expiry <= now
  }
}

impl fmt::Debug for Credential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credential")
      .field("user_id", &self.user_id)
      .field("google_id", &self.google_id)
      .field("access_token", &"<redacted>")
      .field("refresh_token", &"<redacted>")
      .field("expiry", &self.expiry)
      .finish()
  }
}

/// Input to the login flow's credential upsert. Keyed on `google_id`.
#[derive(Clone)]
pub struct NewCredential {
  pub google_id:     String,
  pub email:         String,
  pub name:          String,
  pub access_token:  String,
  pub refresh_token: String,
  pub expiry:        DateTime<Utc>,
}

impl fmt::Debug for NewCredential {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NewCredential")
      .field("google_id", &self.google_id)
      .field("email", &self.email)
      .field("name", &self.name)
      .field("expiry", &self.expiry)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn credential(expiry: DateTime<Utc>) -> Credential {
    Credential {
      user_id: 1,
      google_id: "g-1".into(),
      access_token: "ya29.secret".into(),
      refresh_token: "1//refresh".into(),
      expiry,
    }
  }

  #[test]
  fn expiry_boundary_counts_as_expired() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
    assert!(credential(now).is_expired_at(now));
    assert!(credential(now - Duration::seconds(1)).is_expired_at(now));
    assert!(!credential(now + Duration::seconds(1)).is_expired_at(now));
  }

  #[test]
  fn debug_output_hides_tokens() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap();
    let rendered = format!("{:?}", credential(now));
    assert!(!rendered.contains("ya29.secret"), "{rendered}");
    assert!(!rendered.contains("1//refresh"), "{rendered}");
    assert!(rendered.contains("g-1"));
  }
}
