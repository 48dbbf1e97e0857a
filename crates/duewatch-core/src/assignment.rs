//! Assignments and the due-time window used to select them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A piece of coursework with a concrete due instant.
///
/// Produced per cycle by an [`AssignmentSource`](crate::remote::AssignmentSource);
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
  pub course_id:     String,
  pub course_name:   String,
  /// The source's coursework id. Titles are not unique; this is.
  pub assignment_id: String,
  pub title:         String,
  pub due_time:      DateTime<Utc>,
}

impl Assignment {
  /// The identifier used as the ledger key, both when checking and when
  /// recording a notification.
  pub fn dedup_key(&self) -> &str { &self.assignment_id }
}

// ─── Window ──────────────────────────────────────────────────────────────────

/// A half-open interval `[start, end)` of due instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueWindow {
  start: DateTime<Utc>,
  end:   DateTime<Utc>,
}

impl DueWindow {
  pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
    if end < start {
      return Err(Error::InvalidWindow { start, end });
    }
    Ok(Self { start, end })
  }

  /// The look-ahead window starting at `now`. A span reaching past the last
  /// representable instant is clamped to it.
  pub fn ahead(now: DateTime<Utc>, span: Duration) -> Self {
    let span = span.max(Duration::zero());
    let end  = now.checked_add_signed(span).unwrap_or(DateTime::<Utc>::MAX_UTC);
    Self { start: now, end }
  }

  pub fn start(&self) -> DateTime<Utc> { self.start }

  pub fn end(&self) -> DateTime<Utc> { self.end }

  /// Start-inclusive, end-exclusive.
  pub fn contains(&self, due: DateTime<Utc>) -> bool {
    self.start <= due && due < self.end
  }
}
